//! Operator input forms and the payloads they produce.

use std::fmt::Display;

use rust_decimal::Decimal;
use shared::{
    domain::{CardType, LoanType, TransactionKind, TransferType},
    protocol::{
        CreateCardPayload, CreateLoanPayload, GenerateAccountsPayload,
        GenerateTransactionsPayload, NewTransactionPayload, TransferPayload,
    },
};

use crate::{
    error::{FieldRule, ValidationErrors},
    slot::OperationForm,
};

pub const LABEL_MAX_CHARS: usize = 80;
pub const GENERATE_ACCOUNTS_DEFAULT_COUNT: u32 = 1;
pub const GENERATE_ACCOUNTS_MAX_COUNT: u32 = 50;
pub const GENERATE_TRANSACTIONS_DEFAULT_COUNT: u32 = 10;
pub const GENERATE_TRANSACTIONS_MAX_COUNT: u32 = 100;

fn required<T: Copy>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<T>,
) -> Option<T> {
    if value.is_none() {
        errors.push(field, FieldRule::Required);
    }
    value
}

fn at_least<T: PartialOrd + Display>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<T>,
    min: T,
) {
    if let Some(value) = value {
        if value < min {
            errors.push(field, FieldRule::Min(min.to_string()));
        }
    }
}

fn at_most<T: PartialOrd + Display>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<T>,
    max: T,
) {
    if let Some(value) = value {
        if value > max {
            errors.push(field, FieldRule::Max(max.to_string()));
        }
    }
}

/// Trimmed text, or `None` when nothing is left.
pub fn trimmed_or_absent(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionForm {
    pub kind: TransactionKind,
    pub amount: Option<Decimal>,
    pub label: String,
}

impl OperationForm for TransactionForm {
    type Payload = NewTransactionPayload;

    fn to_payload(&self) -> Result<NewTransactionPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let amount = required(&mut errors, "amount", self.amount);
        at_least(&mut errors, "amount", amount, Decimal::new(1, 2));
        if self.label.chars().count() > LABEL_MAX_CHARS {
            errors.push("label", FieldRule::MaxLength(LABEL_MAX_CHARS));
        }

        errors.into_result(|| NewTransactionPayload {
            kind: self.kind,
            amount: amount.unwrap_or_default(),
            label: trimmed_or_absent(&self.label),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateAccountsForm {
    pub count: u32,
    pub user_id: Option<u64>,
}

impl Default for GenerateAccountsForm {
    fn default() -> Self {
        Self {
            count: GENERATE_ACCOUNTS_DEFAULT_COUNT,
            user_id: None,
        }
    }
}

impl OperationForm for GenerateAccountsForm {
    type Payload = GenerateAccountsPayload;

    fn to_payload(&self) -> Result<GenerateAccountsPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        at_least(&mut errors, "count", Some(self.count), 1);
        at_most(&mut errors, "count", Some(self.count), GENERATE_ACCOUNTS_MAX_COUNT);

        // Zero means "no user" and is left out of the payload like an empty field.
        errors.into_result(|| GenerateAccountsPayload {
            count: self.count,
            user_id: self.user_id.filter(|id| *id > 0),
        })
    }

    fn reset_after_success(&mut self) {
        self.count = GENERATE_ACCOUNTS_DEFAULT_COUNT;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateTransactionsForm {
    pub count: u32,
    pub account_id: Option<u64>,
}

impl Default for GenerateTransactionsForm {
    fn default() -> Self {
        Self {
            count: GENERATE_TRANSACTIONS_DEFAULT_COUNT,
            account_id: None,
        }
    }
}

impl OperationForm for GenerateTransactionsForm {
    type Payload = GenerateTransactionsPayload;

    fn to_payload(&self) -> Result<GenerateTransactionsPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        at_least(&mut errors, "count", Some(self.count), 1);
        at_most(&mut errors, "count", Some(self.count), GENERATE_TRANSACTIONS_MAX_COUNT);
        let account_id = required(&mut errors, "accountId", self.account_id);
        at_least(&mut errors, "accountId", account_id, 1);

        errors.into_result(|| GenerateTransactionsPayload {
            count: self.count,
            account_id: account_id.unwrap_or_default(),
        })
    }

    fn reset_after_success(&mut self) {
        self.count = GENERATE_TRANSACTIONS_DEFAULT_COUNT;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransferForm {
    pub from_account_id: Option<u64>,
    pub to_account_id: Option<u64>,
    pub amount: Option<Decimal>,
    pub description: String,
    pub transfer_type: TransferType,
}

impl OperationForm for TransferForm {
    type Payload = TransferPayload;

    fn to_payload(&self) -> Result<TransferPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let from = required(&mut errors, "fromAccountId", self.from_account_id);
        at_least(&mut errors, "fromAccountId", from, 1);
        let to = required(&mut errors, "toAccountId", self.to_account_id);
        at_least(&mut errors, "toAccountId", to, 1);
        let amount = required(&mut errors, "amount", self.amount);
        at_least(&mut errors, "amount", amount, Decimal::ONE);

        errors.into_result(|| TransferPayload {
            from_account_id: from.unwrap_or_default(),
            to_account_id: to.unwrap_or_default(),
            amount: amount.unwrap_or_default(),
            description: trimmed_or_absent(&self.description),
            transfer_type: Some(self.transfer_type),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardForm {
    pub account_id: Option<u64>,
    pub card_type: CardType,
    pub limit: Option<Decimal>,
}

impl OperationForm for CardForm {
    type Payload = CreateCardPayload;

    fn to_payload(&self) -> Result<CreateCardPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let account_id = required(&mut errors, "accountId", self.account_id);
        at_least(&mut errors, "accountId", account_id, 1);
        at_least(&mut errors, "limit", self.limit, Decimal::ONE);

        // A limit only means something for credit cards.
        let limit = match self.card_type {
            CardType::Credit => self.limit.filter(|limit| *limit > Decimal::ZERO),
            CardType::Debit | CardType::Virtual => None,
        };
        errors.into_result(|| CreateCardPayload {
            account_id: account_id.unwrap_or_default(),
            card_type: self.card_type,
            limit,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoanForm {
    pub account_id: Option<u64>,
    pub loan_type: LoanType,
    pub amount: Option<Decimal>,
    pub interest_rate: Option<Decimal>,
    pub duration_months: Option<u32>,
}

impl OperationForm for LoanForm {
    type Payload = CreateLoanPayload;

    fn to_payload(&self) -> Result<CreateLoanPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let account_id = required(&mut errors, "accountId", self.account_id);
        at_least(&mut errors, "accountId", account_id, 1);
        let amount = required(&mut errors, "amount", self.amount);
        at_least(&mut errors, "amount", amount, Decimal::ONE);
        let interest_rate = required(&mut errors, "interestRate", self.interest_rate);
        at_least(&mut errors, "interestRate", interest_rate, Decimal::ZERO);
        at_most(&mut errors, "interestRate", interest_rate, Decimal::from(20));
        let duration = required(&mut errors, "durationMonths", self.duration_months);
        at_least(&mut errors, "durationMonths", duration, 6);
        at_most(&mut errors, "durationMonths", duration, 360);

        errors.into_result(|| CreateLoanPayload {
            account_id: account_id.unwrap_or_default(),
            loan_type: self.loan_type,
            amount: amount.unwrap_or_default(),
            interest_rate: interest_rate.unwrap_or_default(),
            duration_months: duration.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
