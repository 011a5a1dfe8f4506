use super::*;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shared::domain::{CardType, TransactionKind};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct RecordedRequest {
    path: String,
    api_key: Option<String>,
    body: Option<Value>,
}

#[derive(Clone, Default)]
struct ServerState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ServerState {
    async fn record(&self, path: String, headers: &HeaderMap, body: Option<Value>) {
        let api_key = headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.lock().await.push(RecordedRequest {
            path,
            api_key,
            body,
        });
    }
}

fn account_json(id: &str, balance: f64) -> Value {
    json!({
        "id": id,
        "holder": "Alice",
        "balance": balance,
        "currency": "EUR",
        "transactions": []
    })
}

async fn handle_health(State(state): State<ServerState>, headers: HeaderMap) -> Json<Value> {
    state.record("/health".into(), &headers, None).await;
    Json(json!({
        "status": "ok",
        "service": "banking-api",
        "timestamp": "2024-01-01T00:00:00Z"
    }))
}

async fn handle_list(State(state): State<ServerState>, headers: HeaderMap) -> Json<Value> {
    state.record("/api/accounts".into(), &headers, None).await;
    Json(json!({ "accounts": [account_json("ACC-0001", 1500.0), account_json("ACC-0002", 20.5)] }))
}

async fn handle_get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .record(format!("/api/accounts/{id}"), &headers, None)
        .await;
    if id == "ACC-0404" {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Account not found" })),
        ));
    }
    let mut account = account_json(&id, 1500.0);
    account["iban"] = json!("FR10 1234 1234 1234");
    account["transactions"] = json!([{
        "id": "TX-001",
        "type": "credit",
        "amount": 200,
        "label": "Salaire",
        "timestamp": "2024-01-01T00:00:00Z"
    }]);
    Ok(Json(json!({ "account": account })))
}

async fn handle_create_transaction(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state
        .record(
            format!("/api/accounts/{id}/transactions"),
            &headers,
            Some(body.clone()),
        )
        .await;
    Json(json!({
        "message": "Transaction enregistrée",
        "account": { "id": id, "balance": 1250.0, "currency": "EUR" },
        "transaction": {
            "id": "TX-002",
            "type": body["type"],
            "amount": body["amount"],
            "label": body["label"],
            "timestamp": "2024-01-02T00:00:00Z"
        }
    }))
}

async fn handle_bank(
    State(state): State<ServerState>,
    Path(route): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    state
        .record(format!("/api/bank/{route}"), &headers, Some(body))
        .await;
    match route.as_str() {
        "generate-accounts" => Ok(Json(json!({
            "message": "3 accounts created successfully",
            "data": [{ "id": 1 }, { "id": 2 }, { "id": 3 }]
        }))),
        "loans" => Err((StatusCode::INTERNAL_SERVER_ERROR, "boom".into())),
        _ => Ok(Json(json!({ "message": "ok", "data": {} }))),
    }
}

async fn spawn_bank_server() -> std::io::Result<(String, ServerState)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/accounts", get(handle_list))
        .route("/api/accounts/:id", get(handle_get))
        .route(
            "/api/accounts/:id/transactions",
            post(handle_create_transaction),
        )
        .route("/api/bank/:route", post(handle_bank))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn gateway_for(server_url: &str) -> HttpAccountsGateway {
    HttpAccountsGateway::new(&ClientSettings {
        api_base_url: server_url.to_string(),
        api_key: "test-key".into(),
        ..ClientSettings::default()
    })
    .expect("gateway")
}

#[tokio::test]
async fn maps_account_list_and_sends_api_key() {
    let (server_url, state) = spawn_bank_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url);

    let accounts = gateway.list_accounts().await.expect("accounts");
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].id, AccountId::from("ACC-0001"));
    assert_eq!(accounts[1].balance, Decimal::new(205, 1));
    assert!(accounts[0].transactions.is_empty());

    let requests = state.requests.lock().await;
    assert_eq!(requests[0].path, "/api/accounts");
    assert_eq!(requests[0].api_key.as_deref(), Some("test-key"));
}

#[tokio::test]
async fn maps_account_detail_with_history() {
    let (server_url, _state) = spawn_bank_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url);

    let account = gateway
        .get_account(&AccountId::from("ACC-0001"))
        .await
        .expect("account");
    assert_eq!(account.iban.as_deref(), Some("FR10 1234 1234 1234"));
    assert_eq!(account.transactions.len(), 1);
    assert_eq!(account.transactions[0].kind, TransactionKind::Credit);
    assert_eq!(account.transactions[0].amount, Decimal::from(200));
}

#[tokio::test]
async fn surfaces_server_error_message_on_non_success() {
    let (server_url, _state) = spawn_bank_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url);

    let err = gateway
        .get_account(&AccountId::from("ACC-0404"))
        .await
        .expect_err("missing account");
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(
        crate::error::feedback_message(&err, "fallback"),
        "Account not found"
    );
}

#[tokio::test]
async fn falls_back_to_status_reason_for_unstructured_errors() {
    let (server_url, _state) = spawn_bank_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url);

    let err = gateway
        .create_loan(&CreateLoanPayload {
            account_id: 4,
            loan_type: shared::domain::LoanType::Auto,
            amount: Decimal::from(20_000),
            interest_rate: Decimal::new(42, 1),
            duration_months: 60,
        })
        .await
        .expect_err("loan failure");
    assert!(matches!(err, GatewayError::Status { .. }));
    assert_eq!(
        crate::error::feedback_message(&err, "fallback"),
        "Internal Server Error"
    );
}

#[tokio::test]
async fn posts_transaction_body_without_absent_label() {
    let (server_url, state) = spawn_bank_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url);

    let response = gateway
        .create_transaction(
            &AccountId::from("ACC-0001"),
            &NewTransactionPayload {
                kind: TransactionKind::Debit,
                amount: Decimal::from(250),
                label: None,
            },
        )
        .await
        .expect("transaction");
    assert_eq!(response.message.as_deref(), Some("Transaction enregistrée"));
    assert_eq!(response.transaction.id.as_deref(), Some("TX-002"));

    let requests = state.requests.lock().await;
    let recorded = requests.last().expect("request");
    assert_eq!(recorded.path, "/api/accounts/ACC-0001/transactions");
    let body = recorded.body.as_ref().expect("body");
    assert_eq!(body["type"], json!("debit"));
    assert_eq!(body["amount"].as_f64(), Some(250.0));
    assert!(body.get("label").is_none());
}

#[tokio::test]
async fn posts_camel_case_bank_payloads() {
    let (server_url, state) = spawn_bank_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url);

    let generated = gateway
        .generate_accounts(&GenerateAccountsPayload {
            count: 3,
            user_id: Some(7),
        })
        .await
        .expect("generate");
    assert_eq!(generated.data.len(), 3);

    gateway
        .create_card(&CreateCardPayload {
            account_id: 4,
            card_type: CardType::Debit,
            limit: None,
        })
        .await
        .expect("card");

    let requests = state.requests.lock().await;
    assert_eq!(requests[0].path, "/api/bank/generate-accounts");
    assert_eq!(requests[0].body, Some(json!({ "count": 3, "userId": 7 })));
    assert_eq!(requests[1].path, "/api/bank/cards");
    assert_eq!(
        requests[1].body,
        Some(json!({ "accountId": 4, "cardType": "debit" }))
    );
    assert!(requests.iter().all(|r| r.api_key.as_deref() == Some("test-key")));
}

#[tokio::test]
async fn reads_health_status() {
    let (server_url, _state) = spawn_bank_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url);

    let health = gateway.health().await.expect("health");
    assert_eq!(health.status, "ok");
    assert_eq!(health.service, "banking-api");
}

#[tokio::test]
async fn transport_failure_is_reported_as_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let gateway = gateway_for(&format!("http://{addr}"));
    let err = gateway.list_accounts().await.expect_err("refused");
    assert!(matches!(err, GatewayError::Transport { .. }));
}
