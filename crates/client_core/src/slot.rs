//! Single-flight wrapper binding one validated form to one remote call.
//!
//! A slot is created idle, becomes pending on an accepted submission and
//! settles exactly once into `Succeeded` or `Failed`. The feedback stays visible
//! until the next accepted submission. Submitting while pending is rejected,
//! never queued.

use std::future::Future;

use shared::protocol::Acknowledgement;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{feedback_message, GatewayError, ValidationErrors};

/// Input form owned by a slot. Produces the wire payload or the list of
/// failed field rules.
pub trait OperationForm: Clone + Default + Send + Sync + 'static {
    type Payload: Send;

    fn to_payload(&self) -> Result<Self::Payload, ValidationErrors>;

    /// Shape the form takes after a successful submission.
    fn reset_after_success(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Idle,
    Pending,
    Succeeded(String),
    Failed(String),
}

impl SlotState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn feedback(&self) -> Option<&str> {
        match self {
            Self::Succeeded(message) | Self::Failed(message) => Some(message),
            Self::Idle | Self::Pending => None,
        }
    }
}

/// Default messages used when the server (or the error) provides none.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackDefaults {
    pub success: &'static str,
    pub failure: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct SlotView<F> {
    pub form: F,
    pub touched: bool,
    pub state: SlotState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Invalid(ValidationErrors),
    Busy,
    /// The operation needs a target (the selected account) and none is set.
    NoTarget,
}

#[derive(Debug)]
pub enum Submission<T> {
    Rejected(Rejection),
    Succeeded(T),
    Failed(String),
    /// Owner was torn down while the call was in flight.
    Cancelled,
}

impl<T> Submission<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

pub struct AsyncOperationSlot<F: OperationForm> {
    name: &'static str,
    defaults: FeedbackDefaults,
    view: watch::Sender<SlotView<F>>,
    cancel: CancellationToken,
}

impl<F: OperationForm> AsyncOperationSlot<F> {
    pub fn new(name: &'static str, defaults: FeedbackDefaults, cancel: CancellationToken) -> Self {
        let (view, _) = watch::channel(SlotView::default());
        Self {
            name,
            defaults,
            view,
            cancel,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn subscribe(&self) -> watch::Receiver<SlotView<F>> {
        self.view.subscribe()
    }

    pub fn snapshot(&self) -> SlotView<F> {
        self.view.borrow().clone()
    }

    pub fn form(&self) -> F {
        self.view.borrow().form.clone()
    }

    pub fn state(&self) -> SlotState {
        self.view.borrow().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.view.borrow().state.is_pending()
    }

    pub fn is_touched(&self) -> bool {
        self.view.borrow().touched
    }

    pub fn is_valid(&self) -> bool {
        self.view.borrow().form.to_payload().is_ok()
    }

    /// Field errors worth showing: only once the form has been touched.
    pub fn visible_errors(&self) -> ValidationErrors {
        let view = self.view.borrow();
        if !view.touched {
            return ValidationErrors::default();
        }
        view.form.to_payload().err().unwrap_or_default()
    }

    pub fn disable_submit(&self) -> bool {
        let view = self.view.borrow();
        view.state.is_pending() || view.form.to_payload().is_err()
    }

    pub fn edit(&self, update: impl FnOnce(&mut F)) {
        self.view.send_modify(|view| update(&mut view.form));
    }

    pub fn set_form(&self, form: F) {
        self.edit(|current| *current = form);
    }

    /// Validates and transitions to pending in one step so two callers can
    /// never both be accepted.
    fn begin(&self) -> Result<F::Payload, Rejection> {
        let mut outcome = Err(Rejection::Busy);
        self.view.send_if_modified(|view| {
            if view.state.is_pending() {
                view.touched = true;
                return true;
            }
            match view.form.to_payload() {
                Ok(payload) => {
                    view.state = SlotState::Pending;
                    outcome = Ok(payload);
                }
                Err(errors) => {
                    view.touched = true;
                    outcome = Err(Rejection::Invalid(errors));
                }
            }
            true
        });
        outcome
    }

    fn settle(&self, state: SlotState, reset_form: bool) {
        self.view.send_modify(|view| {
            view.state = state;
            if reset_form {
                view.form.reset_after_success();
                view.touched = false;
            }
        });
    }

    /// Runs `call` with the validated payload unless the slot rejects the
    /// submission. Errors are folded into the slot state, never propagated.
    pub async fn submit<T, Fut>(&self, call: impl FnOnce(F::Payload) -> Fut) -> Submission<T>
    where
        T: Acknowledgement,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        if self.cancel.is_cancelled() {
            debug!(slot = self.name, "submission after shutdown ignored");
            return Submission::Cancelled;
        }
        let payload = match self.begin() {
            Ok(payload) => payload,
            Err(rejection) => {
                debug!(slot = self.name, ?rejection, "submission rejected");
                return Submission::Rejected(rejection);
            }
        };

        let _pending = PendingGuard { view: &self.view };
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = call(payload) => Some(result),
        };

        match result {
            None => {
                debug!(slot = self.name, "submission cancelled");
                Submission::Cancelled
            }
            Some(Ok(response)) => {
                let message = response
                    .message()
                    .map(str::trim)
                    .filter(|message| !message.is_empty())
                    .unwrap_or(self.defaults.success)
                    .to_string();
                info!(slot = self.name, %message, "operation succeeded");
                self.settle(SlotState::Succeeded(message), true);
                Submission::Succeeded(response)
            }
            Some(Err(err)) => {
                let message = feedback_message(&err, self.defaults.failure);
                warn!(slot = self.name, error = %err, "operation failed");
                self.settle(SlotState::Failed(message.clone()), false);
                Submission::Failed(message)
            }
        }
    }
}

/// Clears a pending state left behind by cancellation or a dropped future.
struct PendingGuard<'a, F> {
    view: &'a watch::Sender<SlotView<F>>,
}

impl<F> Drop for PendingGuard<'_, F> {
    fn drop(&mut self) {
        self.view.send_if_modified(|view| {
            if view.state.is_pending() {
                view.state = SlotState::Idle;
                true
            } else {
                false
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/slot_tests.rs"]
mod tests;
