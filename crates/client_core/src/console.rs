//! Five independent mutation workflows against the banking API. The slots
//! share nothing but the gateway; a failure in one never touches another.

use std::sync::Arc;

use shared::protocol::{
    CreateCardResponse, CreateLoanResponse, GenerateAccountsResponse,
    GenerateTransactionsResponse, TransferResponse,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    forms::{CardForm, GenerateAccountsForm, GenerateTransactionsForm, LoanForm, TransferForm},
    gateway::AccountsGateway,
    slot::{AsyncOperationSlot, FeedbackDefaults, Submission},
};

const GENERATE_ACCOUNTS_FEEDBACK: FeedbackDefaults = FeedbackDefaults {
    success: "Accounts generated.",
    failure: "Unable to generate accounts.",
};
const GENERATE_TRANSACTIONS_FEEDBACK: FeedbackDefaults = FeedbackDefaults {
    success: "Transactions generated.",
    failure: "Unable to generate transactions.",
};
const TRANSFER_FEEDBACK: FeedbackDefaults = FeedbackDefaults {
    success: "Transfer completed.",
    failure: "Unable to complete the transfer.",
};
const CARD_FEEDBACK: FeedbackDefaults = FeedbackDefaults {
    success: "Card created.",
    failure: "Unable to create the card.",
};
const LOAN_FEEDBACK: FeedbackDefaults = FeedbackDefaults {
    success: "Loan created.",
    failure: "Unable to create the loan.",
};

/// Notifications for whoever displays account data (the account browser).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    AccountsGenerated { count: usize },
    TransactionsGenerated { account_id: u64, count: usize },
}

pub struct OperationsConsole {
    gateway: Arc<dyn AccountsGateway>,
    generate_accounts: AsyncOperationSlot<GenerateAccountsForm>,
    generate_transactions: AsyncOperationSlot<GenerateTransactionsForm>,
    transfer: AsyncOperationSlot<TransferForm>,
    card: AsyncOperationSlot<CardForm>,
    loan: AsyncOperationSlot<LoanForm>,
    events: broadcast::Sender<ConsoleEvent>,
    cancel: CancellationToken,
}

impl OperationsConsole {
    pub fn new(gateway: Arc<dyn AccountsGateway>) -> Arc<Self> {
        let cancel = CancellationToken::new();
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            gateway,
            generate_accounts: AsyncOperationSlot::new(
                "generate_accounts",
                GENERATE_ACCOUNTS_FEEDBACK,
                cancel.clone(),
            ),
            generate_transactions: AsyncOperationSlot::new(
                "generate_transactions",
                GENERATE_TRANSACTIONS_FEEDBACK,
                cancel.clone(),
            ),
            transfer: AsyncOperationSlot::new("transfer", TRANSFER_FEEDBACK, cancel.clone()),
            card: AsyncOperationSlot::new("card", CARD_FEEDBACK, cancel.clone()),
            loan: AsyncOperationSlot::new("loan", LOAN_FEEDBACK, cancel.clone()),
            events,
            cancel,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn generate_accounts_slot(&self) -> &AsyncOperationSlot<GenerateAccountsForm> {
        &self.generate_accounts
    }

    pub fn generate_transactions_slot(&self) -> &AsyncOperationSlot<GenerateTransactionsForm> {
        &self.generate_transactions
    }

    pub fn transfer_slot(&self) -> &AsyncOperationSlot<TransferForm> {
        &self.transfer
    }

    pub fn card_slot(&self) -> &AsyncOperationSlot<CardForm> {
        &self.card
    }

    pub fn loan_slot(&self) -> &AsyncOperationSlot<LoanForm> {
        &self.loan
    }

    pub fn disable_generate_accounts(&self) -> bool {
        self.generate_accounts.disable_submit()
    }

    pub fn disable_generate_transactions(&self) -> bool {
        self.generate_transactions.disable_submit()
    }

    pub fn disable_transfer(&self) -> bool {
        self.transfer.disable_submit()
    }

    pub fn disable_card_creation(&self) -> bool {
        self.card.disable_submit()
    }

    pub fn disable_loan_creation(&self) -> bool {
        self.loan.disable_submit()
    }

    pub async fn generate_accounts(&self) -> Submission<GenerateAccountsResponse> {
        let gateway = &self.gateway;
        let outcome = self
            .generate_accounts
            .submit(|payload| async move { gateway.generate_accounts(&payload).await })
            .await;
        if let Submission::Succeeded(response) = &outcome {
            let _ = self.events.send(ConsoleEvent::AccountsGenerated {
                count: response.data.len(),
            });
        }
        outcome
    }

    pub async fn generate_transactions(&self) -> Submission<GenerateTransactionsResponse> {
        let gateway = &self.gateway;
        let mut account_id = 0;
        let outcome = self
            .generate_transactions
            .submit(|payload| {
                account_id = payload.account_id;
                async move { gateway.generate_transactions(&payload).await }
            })
            .await;
        if let Submission::Succeeded(response) = &outcome {
            let _ = self.events.send(ConsoleEvent::TransactionsGenerated {
                account_id,
                count: response.data.len(),
            });
        }
        outcome
    }

    pub async fn transfer_funds(&self) -> Submission<TransferResponse> {
        let gateway = &self.gateway;
        self.transfer
            .submit(|payload| async move { gateway.transfer_funds(&payload).await })
            .await
    }

    pub async fn create_card(&self) -> Submission<CreateCardResponse> {
        let gateway = &self.gateway;
        self.card
            .submit(|payload| async move { gateway.create_card(&payload).await })
            .await
    }

    pub async fn create_loan(&self) -> Submission<CreateLoanResponse> {
        let gateway = &self.gateway;
        self.loan
            .submit(|payload| async move { gateway.create_loan(&payload).await })
            .await
    }
}

impl Drop for OperationsConsole {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
