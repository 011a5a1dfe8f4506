use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountId, CardType, LoanType, Transaction, TransactionKind, TransferType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    #[serde(
        default,
        with = "crate::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: Account,
}

/// Balance echo returned by the transaction endpoint. Informational only: the
/// browser always re-fetches the account instead of trusting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub id: AccountId,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub account: AccountBalance,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransactionPayload {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAccountsPayload {
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTransactionsPayload {
    pub count: u32,
    pub account_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub from_account_id: u64,
    pub to_account_id: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_type: Option<TransferType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardPayload {
    pub account_id: u64,
    pub card_type: CardType,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub limit: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanPayload {
    pub account_id: u64,
    pub loan_type: LoanType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub interest_rate: Decimal,
    pub duration_months: u32,
}

/// Records produced by the generator endpoints. The server owns their shape,
/// so they are kept as raw JSON objects.
pub type GeneratedAccount = serde_json::Value;
pub type GeneratedTransaction = serde_json::Value;

/// Envelope shared by every `/api/bank/*` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankOperationResponse<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

pub type GenerateAccountsResponse = BankOperationResponse<Vec<GeneratedAccount>>;
pub type GenerateTransactionsResponse = BankOperationResponse<Vec<GeneratedTransaction>>;
pub type TransferResponse = BankOperationResponse<serde_json::Value>;
pub type CreateCardResponse = BankOperationResponse<serde_json::Value>;
pub type CreateLoanResponse = BankOperationResponse<serde_json::Value>;

/// Responses that carry a server-provided confirmation message.
pub trait Acknowledgement {
    fn message(&self) -> Option<&str>;
}

impl Acknowledgement for TransactionResponse {
    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl<T> Acknowledgement for BankOperationResponse<T> {
    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
