//! Request/response mapping for the banking API. Implementations hold no state
//! beyond their transport.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, RequestBuilder,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Account, AccountId},
    error::ApiErrorBody,
    protocol::{
        AccountResponse, AccountsResponse, CreateCardPayload, CreateCardResponse,
        CreateLoanPayload, CreateLoanResponse, GenerateAccountsPayload, GenerateAccountsResponse,
        GenerateTransactionsPayload, GenerateTransactionsResponse, HealthStatus,
        NewTransactionPayload, TransactionResponse, TransferPayload, TransferResponse,
    },
};
use tracing::debug;

use crate::{config::ClientSettings, error::GatewayError};

#[async_trait]
pub trait AccountsGateway: Send + Sync {
    async fn health(&self) -> Result<HealthStatus, GatewayError>;
    async fn list_accounts(&self) -> Result<Vec<Account>, GatewayError>;
    async fn get_account(&self, account_id: &AccountId) -> Result<Account, GatewayError>;
    async fn create_transaction(
        &self,
        account_id: &AccountId,
        payload: &NewTransactionPayload,
    ) -> Result<TransactionResponse, GatewayError>;
    async fn generate_accounts(
        &self,
        payload: &GenerateAccountsPayload,
    ) -> Result<GenerateAccountsResponse, GatewayError>;
    async fn generate_transactions(
        &self,
        payload: &GenerateTransactionsPayload,
    ) -> Result<GenerateTransactionsResponse, GatewayError>;
    async fn transfer_funds(
        &self,
        payload: &TransferPayload,
    ) -> Result<TransferResponse, GatewayError>;
    async fn create_card(
        &self,
        payload: &CreateCardPayload,
    ) -> Result<CreateCardResponse, GatewayError>;
    async fn create_loan(
        &self,
        payload: &CreateLoanPayload,
    ) -> Result<CreateLoanResponse, GatewayError>;
}

/// `AccountsGateway` over HTTP/JSON. The API key header is installed as a
/// client default header so every request carries it.
pub struct HttpAccountsGateway {
    http: Client,
    base_url: String,
}

impl HttpAccountsGateway {
    pub fn new(settings: &ClientSettings) -> Result<Self, GatewayError> {
        let base_url = settings
            .base_url()
            .map_err(|err| GatewayError::InvalidUrl(err.to_string()))?;

        let header_name = HeaderName::from_bytes(settings.api_key_header.trim().as_bytes())
            .map_err(|err| GatewayError::Other(format!("invalid api key header name: {err}")))?;
        let mut header_value = HeaderValue::from_str(&settings.api_key)
            .map_err(|err| GatewayError::Other(format!("invalid api key value: {err}")))?;
        header_value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(header_name, header_value);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| GatewayError::Other(format!("failed to build http client: {err}")))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        url: String,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|source| GatewayError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.text().map(str::to_string))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                });
            debug!(%url, %status, %message, "banking api rejected request");
            return Err(GatewayError::Status {
                url,
                status,
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| GatewayError::Decode { url, source })
    }
}

#[async_trait]
impl AccountsGateway for HttpAccountsGateway {
    async fn health(&self) -> Result<HealthStatus, GatewayError> {
        let url = self.url("/health");
        self.execute(url.clone(), self.http.get(url)).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, GatewayError> {
        let url = self.url("/api/accounts");
        let body: AccountsResponse = self.execute(url.clone(), self.http.get(url)).await?;
        Ok(body.accounts)
    }

    async fn get_account(&self, account_id: &AccountId) -> Result<Account, GatewayError> {
        let url = self.url(&format!("/api/accounts/{}", account_id.as_str()));
        let body: AccountResponse = self.execute(url.clone(), self.http.get(url)).await?;
        Ok(body.account)
    }

    async fn create_transaction(
        &self,
        account_id: &AccountId,
        payload: &NewTransactionPayload,
    ) -> Result<TransactionResponse, GatewayError> {
        let url = self.url(&format!("/api/accounts/{}/transactions", account_id.as_str()));
        self.execute(url.clone(), self.http.post(url).json(payload))
            .await
    }

    async fn generate_accounts(
        &self,
        payload: &GenerateAccountsPayload,
    ) -> Result<GenerateAccountsResponse, GatewayError> {
        let url = self.url("/api/bank/generate-accounts");
        self.execute(url.clone(), self.http.post(url).json(payload))
            .await
    }

    async fn generate_transactions(
        &self,
        payload: &GenerateTransactionsPayload,
    ) -> Result<GenerateTransactionsResponse, GatewayError> {
        let url = self.url("/api/bank/generate-transactions");
        self.execute(url.clone(), self.http.post(url).json(payload))
            .await
    }

    async fn transfer_funds(
        &self,
        payload: &TransferPayload,
    ) -> Result<TransferResponse, GatewayError> {
        let url = self.url("/api/bank/transfers");
        self.execute(url.clone(), self.http.post(url).json(payload))
            .await
    }

    async fn create_card(
        &self,
        payload: &CreateCardPayload,
    ) -> Result<CreateCardResponse, GatewayError> {
        let url = self.url("/api/bank/cards");
        self.execute(url.clone(), self.http.post(url).json(payload))
            .await
    }

    async fn create_loan(
        &self,
        payload: &CreateLoanPayload,
    ) -> Result<CreateLoanResponse, GatewayError> {
        let url = self.url("/api/bank/loans");
        self.execute(url.clone(), self.http.post(url).json(payload))
            .await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
