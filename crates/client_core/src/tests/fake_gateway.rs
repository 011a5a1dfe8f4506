//! In-memory `AccountsGateway` for controller tests. Records every call and can
//! hold individual requests open until a test releases them.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shared::{
    domain::{Account, AccountId, Transaction, TransactionKind},
    protocol::{
        AccountBalance, BankOperationResponse, CreateCardPayload, CreateCardResponse,
        CreateLoanPayload, CreateLoanResponse, GenerateAccountsPayload, GenerateAccountsResponse,
        GenerateTransactionsPayload, GenerateTransactionsResponse, HealthStatus,
        NewTransactionPayload, TransactionResponse, TransferPayload, TransferResponse,
    },
};
use tokio::sync::{oneshot, Mutex};

use crate::{error::GatewayError, gateway::AccountsGateway};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Health,
    ListAccounts,
    GetAccount(AccountId),
    CreateTransaction(AccountId, NewTransactionPayload),
    GenerateAccounts(GenerateAccountsPayload),
    GenerateTransactions(GenerateTransactionsPayload),
    Transfer(TransferPayload),
    CreateCard(CreateCardPayload),
    CreateLoan(CreateLoanPayload),
}

/// Releases one held request when dropped or sent.
pub type Gate = oneshot::Sender<()>;

#[derive(Default)]
pub struct FakeGateway {
    pub calls: Mutex<Vec<GatewayCall>>,
    pub accounts: Mutex<Vec<Account>>,
    pub details: Mutex<HashMap<AccountId, Account>>,
    pub list_error: Mutex<Option<String>>,
    pub health_error: Mutex<bool>,
    /// Operation route (`"transaction"`, `"generate_accounts"`, ...) -> error text.
    pub mutation_errors: Mutex<HashMap<&'static str, String>>,
    list_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    detail_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    mutation_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
}

pub fn summary(id: &str, balance: i64) -> Account {
    Account {
        id: AccountId::from(id),
        holder: "Alice".into(),
        balance: Decimal::from(balance),
        currency: "EUR".into(),
        iban: None,
        last_updated: None,
        transactions: Vec::new(),
    }
}

pub fn detail(id: &str, balance: i64) -> Account {
    Account {
        iban: Some("FR10 1234 1234 1234".into()),
        transactions: vec![Transaction {
            id: Some("TX-001".into()),
            kind: TransactionKind::Credit,
            amount: Decimal::from(200),
            label: Some("Salaire".into()),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
        }],
        ..summary(id, balance)
    }
}

impl FakeGateway {
    pub fn with_accounts(details: Vec<Account>) -> Self {
        let gateway = Self::default();
        {
            let summaries = details
                .iter()
                .map(|account| Account {
                    transactions: Vec::new(),
                    ..account.clone()
                })
                .collect();
            *gateway.accounts.try_lock().expect("fresh lock") = summaries;
            *gateway.details.try_lock().expect("fresh lock") = details
                .into_iter()
                .map(|account| (account.id.clone(), account))
                .collect();
        }
        gateway
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().await.clone()
    }

    pub async fn detail_calls(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| matches!(call, GatewayCall::GetAccount(_)))
            .count()
    }

    pub async fn hold_next_list(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.list_gates.lock().await.push_back(rx);
        tx
    }

    pub async fn hold_next_detail(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.detail_gates.lock().await.push_back(rx);
        tx
    }

    pub async fn hold_next_mutation(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.mutation_gates.lock().await.push_back(rx);
        tx
    }

    pub async fn set_detail(&self, account: Account) {
        self.details.lock().await.insert(account.id.clone(), account);
    }

    pub async fn fail_mutation(&self, route: &'static str, message: &str) {
        self.mutation_errors
            .lock()
            .await
            .insert(route, message.to_string());
    }

    async fn record(&self, call: GatewayCall) {
        self.calls.lock().await.push(call);
    }

    async fn wait(gates: &Mutex<VecDeque<oneshot::Receiver<()>>>) {
        let gate = gates.lock().await.pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }

    async fn mutation<T>(&self, route: &'static str, response: T) -> Result<T, GatewayError> {
        let error = self.mutation_errors.lock().await.get(route).cloned();
        Self::wait(&self.mutation_gates).await;
        match error {
            Some(message) => Err(GatewayError::Other(message)),
            None => Ok(response),
        }
    }
}

fn ok_envelope<T>(message: &str, data: T) -> BankOperationResponse<T> {
    BankOperationResponse {
        message: Some(message.to_string()),
        data,
    }
}

#[async_trait]
impl AccountsGateway for FakeGateway {
    async fn health(&self) -> Result<HealthStatus, GatewayError> {
        self.record(GatewayCall::Health).await;
        if *self.health_error.lock().await {
            return Err(GatewayError::Other("health down".into()));
        }
        Ok(HealthStatus {
            status: "ok".into(),
            service: "api".into(),
            timestamp: Some(Utc::now()),
        })
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, GatewayError> {
        self.record(GatewayCall::ListAccounts).await;
        let result = match self.list_error.lock().await.clone() {
            Some(message) => Err(GatewayError::Other(message)),
            None => Ok(self.accounts.lock().await.clone()),
        };
        Self::wait(&self.list_gates).await;
        result
    }

    async fn get_account(&self, account_id: &AccountId) -> Result<Account, GatewayError> {
        self.record(GatewayCall::GetAccount(account_id.clone())).await;
        let result = self
            .details
            .lock()
            .await
            .get(account_id)
            .cloned()
            .ok_or_else(|| GatewayError::Other(format!("Account {account_id} not found")));
        Self::wait(&self.detail_gates).await;
        result
    }

    async fn create_transaction(
        &self,
        account_id: &AccountId,
        payload: &NewTransactionPayload,
    ) -> Result<TransactionResponse, GatewayError> {
        self.record(GatewayCall::CreateTransaction(
            account_id.clone(),
            payload.clone(),
        ))
        .await;
        let response = TransactionResponse {
            message: Some("Transaction enregistrée".into()),
            account: AccountBalance {
                id: account_id.clone(),
                balance: Decimal::ZERO,
                currency: "EUR".into(),
            },
            transaction: Transaction {
                id: Some("TX-002".into()),
                kind: payload.kind,
                amount: payload.amount,
                label: payload.label.clone(),
                timestamp: None,
            },
        };
        self.mutation("transaction", response).await
    }

    async fn generate_accounts(
        &self,
        payload: &GenerateAccountsPayload,
    ) -> Result<GenerateAccountsResponse, GatewayError> {
        self.record(GatewayCall::GenerateAccounts(payload.clone()))
            .await;
        let data: Vec<Value> = (0..payload.count).map(|n| json!({ "id": n + 1 })).collect();
        let message = format!("{} accounts created successfully", payload.count);
        self.mutation("generate_accounts", ok_envelope(&message, data))
            .await
    }

    async fn generate_transactions(
        &self,
        payload: &GenerateTransactionsPayload,
    ) -> Result<GenerateTransactionsResponse, GatewayError> {
        self.record(GatewayCall::GenerateTransactions(payload.clone()))
            .await;
        let data: Vec<Value> = (0..payload.count).map(|n| json!({ "id": n + 1 })).collect();
        self.mutation("generate_transactions", ok_envelope("ok", data))
            .await
    }

    async fn transfer_funds(
        &self,
        payload: &TransferPayload,
    ) -> Result<TransferResponse, GatewayError> {
        self.record(GatewayCall::Transfer(payload.clone())).await;
        self.mutation(
            "transfer",
            ok_envelope(
                "Transfer completed successfully",
                json!({ "success": true }),
            ),
        )
        .await
    }

    async fn create_card(
        &self,
        payload: &CreateCardPayload,
    ) -> Result<CreateCardResponse, GatewayError> {
        self.record(GatewayCall::CreateCard(payload.clone())).await;
        self.mutation("card", ok_envelope("Card created successfully", json!({})))
            .await
    }

    async fn create_loan(
        &self,
        payload: &CreateLoanPayload,
    ) -> Result<CreateLoanResponse, GatewayError> {
        self.record(GatewayCall::CreateLoan(payload.clone())).await;
        self.mutation("loan", ok_envelope("Loan created successfully", json!({})))
            .await
    }
}
