//! Account list + selected-account detail, kept consistent while list loads,
//! detail fetches and transaction submissions race each other.

use std::sync::Arc;

use shared::{
    domain::{Account, AccountId},
    protocol::{HealthStatus, TransactionResponse},
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    console::ConsoleEvent,
    error::feedback_message,
    forms::TransactionForm,
    gateway::AccountsGateway,
    slot::{AsyncOperationSlot, FeedbackDefaults, Rejection, Submission},
};

const LOAD_ACCOUNTS_FAILED: &str = "Unable to load accounts.";
const LOAD_ACCOUNT_FAILED: &str = "Unable to load the account.";
const TRANSACTION_FEEDBACK: FeedbackDefaults = FeedbackDefaults {
    success: "Transaction recorded.",
    failure: "Unable to create the transaction.",
};

#[derive(Debug, Clone, Default)]
pub struct BrowserState {
    pub accounts: Vec<Account>,
    /// Detail record of the selected account.
    pub selected: Option<Account>,
    pub health: Option<HealthStatus>,
    pub loading_accounts: bool,
    pub loading_detail: bool,
    pub error: Option<String>,
    detail_ticket: u64,
}

impl BrowserState {
    pub fn selected_id(&self) -> Option<&AccountId> {
        self.selected.as_ref().map(|account| &account.id)
    }

    pub fn contains(&self, account_id: &AccountId) -> bool {
        self.accounts.iter().any(|account| &account.id == account_id)
    }

    /// Makes `account` the selection and patches its list entry.
    fn apply_detail(&mut self, account: Account) {
        patch_list(&mut self.accounts, &account);
        self.selected = Some(account);
    }
}

/// Replaces every list entry whose id matches `account`. Entries with other
/// ids are untouched, so applying the same record twice is a no-op.
pub fn patch_list(accounts: &mut [Account], account: &Account) {
    for entry in accounts.iter_mut().filter(|entry| entry.id == account.id) {
        *entry = account.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Applied,
    Failed(String),
    /// A newer detail fetch started meanwhile; this response was discarded.
    Superseded,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Empty identifier; nothing to do.
    Ignored,
    /// A detail fetch is already in flight, the request was dropped.
    Dropped,
    Fetched(DetailOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded {
        count: usize,
        detail: Option<DetailOutcome>,
    },
    Failed(String),
    /// A list load is already in flight.
    Dropped,
    Cancelled,
}

pub struct AccountBrowser {
    gateway: Arc<dyn AccountsGateway>,
    state: watch::Sender<BrowserState>,
    transaction: AsyncOperationSlot<TransactionForm>,
    cancel: CancellationToken,
}

impl AccountBrowser {
    pub fn new(gateway: Arc<dyn AccountsGateway>) -> Arc<Self> {
        let cancel = CancellationToken::new();
        let (state, _) = watch::channel(BrowserState::default());
        Arc::new(Self {
            gateway,
            state,
            transaction: AsyncOperationSlot::new(
                "transaction",
                TRANSACTION_FEEDBACK,
                cancel.clone(),
            ),
            cancel,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<BrowserState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> BrowserState {
        self.state.borrow().clone()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.state.borrow().accounts.clone()
    }

    pub fn selected(&self) -> Option<Account> {
        self.state.borrow().selected.clone()
    }

    pub fn selected_id(&self) -> Option<AccountId> {
        self.state.borrow().selected_id().cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn health(&self) -> Option<HealthStatus> {
        self.state.borrow().health.clone()
    }

    pub fn is_loading_accounts(&self) -> bool {
        self.state.borrow().loading_accounts
    }

    pub fn is_loading_detail(&self) -> bool {
        self.state.borrow().loading_detail
    }

    pub fn transaction_slot(&self) -> &AsyncOperationSlot<TransactionForm> {
        &self.transaction
    }

    pub fn disable_submit(&self) -> bool {
        self.transaction.disable_submit() || self.state.borrow().selected.is_none()
    }

    /// Cancels every request this browser still has in flight.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Startup sequence: health probe and first account load.
    pub fn init(self: &Arc<Self>) -> JoinHandle<()> {
        let browser = Arc::clone(self);
        tokio::spawn(async move {
            browser.refresh_all().await;
        })
    }

    pub async fn refresh_all(&self) -> LoadOutcome {
        self.load_health().await;
        self.load_accounts().await
    }

    pub async fn reload_accounts(&self) -> LoadOutcome {
        self.load_accounts().await
    }

    pub async fn load_health(&self) {
        if self.is_shut_down() {
            return;
        }
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            result = self.gateway.health() => result,
        };
        let health = match result {
            Ok(health) => Some(health),
            Err(err) => {
                debug!(error = %err, "health probe failed");
                None
            }
        };
        self.state.send_modify(|state| state.health = health);
    }

    pub async fn load_accounts(&self) -> LoadOutcome {
        if self.is_shut_down() {
            return LoadOutcome::Cancelled;
        }
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.loading_accounts {
                return false;
            }
            state.loading_accounts = true;
            state.error = None;
            accepted = true;
            true
        });
        if !accepted {
            debug!("account list load already in flight");
            return LoadOutcome::Dropped;
        }

        let loading = ListLoadingGuard {
            state: &self.state,
            armed: true,
        };
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return LoadOutcome::Cancelled,
            result = self.gateway.list_accounts() => result,
        };
        loading.disarm();

        let accounts = match result {
            Ok(accounts) => accounts,
            Err(err) => {
                let message = feedback_message(&err, LOAD_ACCOUNTS_FAILED);
                warn!(error = %err, "failed to load accounts");
                self.state.send_modify(|state| {
                    state.loading_accounts = false;
                    state.error = Some(message.clone());
                });
                return LoadOutcome::Failed(message);
            }
        };

        let count = accounts.len();
        let mut follow_up = None;
        self.state.send_modify(|state| {
            state.loading_accounts = false;
            state.accounts = accounts;
            follow_up = match state.accounts.first() {
                None => {
                    state.selected = None;
                    None
                }
                Some(first) => match state.selected_id() {
                    Some(current) if state.contains(current) => Some(current.clone()),
                    _ => Some(first.id.clone()),
                },
            };
        });
        info!(count, "account list loaded");

        let detail = match follow_up {
            Some(account_id) => Some(self.fetch_detail(account_id).await),
            None => None,
        };
        LoadOutcome::Loaded { count, detail }
    }

    /// Operator selection. Dropped while another detail fetch is outstanding so
    /// a slow response can never overwrite a newer one.
    pub async fn select_account(&self, account_id: impl Into<AccountId>) -> SelectOutcome {
        let account_id = account_id.into();
        if account_id.is_empty() {
            return SelectOutcome::Ignored;
        }
        if self.is_shut_down() {
            return SelectOutcome::Fetched(DetailOutcome::Cancelled);
        }

        let mut ticket = None;
        self.state.send_if_modified(|state| {
            if state.loading_detail {
                return false;
            }
            ticket = Some(begin_detail(state));
            true
        });
        let Some(ticket) = ticket else {
            debug!(account_id = %account_id, "selection dropped, detail fetch in flight");
            return SelectOutcome::Dropped;
        };

        SelectOutcome::Fetched(self.run_detail(account_id, ticket).await)
    }

    /// Fetches one account and publishes it as the selection. Any older fetch
    /// still in flight is superseded and its response discarded.
    pub async fn fetch_detail(&self, account_id: AccountId) -> DetailOutcome {
        if self.is_shut_down() {
            return DetailOutcome::Cancelled;
        }
        let mut ticket = 0;
        self.state.send_modify(|state| ticket = begin_detail(state));
        self.run_detail(account_id, ticket).await
    }

    async fn run_detail(&self, account_id: AccountId, ticket: u64) -> DetailOutcome {
        let _loading = DetailLoadingGuard {
            state: &self.state,
            ticket,
        };
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return DetailOutcome::Cancelled,
            result = self.gateway.get_account(&account_id) => result,
        };

        let mut outcome = DetailOutcome::Superseded;
        self.state.send_if_modified(|state| {
            if state.detail_ticket != ticket {
                return false;
            }
            state.loading_detail = false;
            outcome = match result {
                Ok(account) => {
                    state.apply_detail(account);
                    DetailOutcome::Applied
                }
                Err(err) => {
                    warn!(account_id = %account_id, error = %err, "failed to load account");
                    let message = feedback_message(&err, LOAD_ACCOUNT_FAILED);
                    state.error = Some(message.clone());
                    DetailOutcome::Failed(message)
                }
            };
            true
        });
        if outcome == DetailOutcome::Superseded {
            debug!(account_id = %account_id, "discarding superseded account detail");
        }
        outcome
    }

    /// Posts the transaction form against the selected account, then re-reads
    /// the account; the endpoint's own balance echo is not used.
    pub async fn submit_transaction(&self) -> Submission<TransactionResponse> {
        let Some(account_id) = self.selected_id() else {
            debug!("transaction rejected, no account selected");
            return Submission::Rejected(Rejection::NoTarget);
        };

        let gateway = &self.gateway;
        let target = account_id.clone();
        let outcome = self
            .transaction
            .submit(|payload| async move { gateway.create_transaction(&target, &payload).await })
            .await;

        if outcome.is_success() {
            self.fetch_detail(account_id).await;
        }
        outcome
    }

    /// Reloads the list whenever the operations console reports new data.
    /// The listener only holds a weak handle, so dropping the last browser
    /// handle still tears it down.
    pub fn follow_console(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<ConsoleEvent>,
    ) -> JoinHandle<()> {
        let browser = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(event) => debug!(?event, "console reported account changes"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "console events lagged, reloading once");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let Some(browser) = browser.upgrade() else {
                    break;
                };
                browser.reload_accounts().await;
            }
        })
    }
}

impl Drop for AccountBrowser {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn begin_detail(state: &mut BrowserState) -> u64 {
    state.detail_ticket += 1;
    state.loading_detail = true;
    state.error = None;
    state.detail_ticket
}

/// Clears `loading_accounts` if the load is abandoned before its result lands.
struct ListLoadingGuard<'a> {
    state: &'a watch::Sender<BrowserState>,
    armed: bool,
}

impl ListLoadingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ListLoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.state.send_if_modified(|state| {
            let was_loading = state.loading_accounts;
            state.loading_accounts = false;
            was_loading
        });
    }
}

struct DetailLoadingGuard<'a> {
    state: &'a watch::Sender<BrowserState>,
    ticket: u64,
}

impl Drop for DetailLoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if state.detail_ticket != self.ticket || !state.loading_detail {
                return false;
            }
            state.loading_detail = false;
            true
        });
    }
}

#[cfg(test)]
#[path = "tests/browser_tests.rs"]
mod tests;
