//! Client-side state synchronization for the accounts dashboard.
//!
//! [`AccountBrowser`] owns the account list and the selected account,
//! [`OperationsConsole`] runs the mutating bank operations, and both are built
//! on [`AsyncOperationSlot`]. All remote access goes through an
//! [`AccountsGateway`].

pub mod browser;
pub mod config;
pub mod console;
pub mod error;
pub mod forms;
pub mod gateway;
pub mod slot;

pub use browser::{AccountBrowser, BrowserState, DetailOutcome, LoadOutcome, SelectOutcome};
pub use config::{load_settings, ClientSettings};
pub use console::{ConsoleEvent, OperationsConsole};
pub use error::{FieldError, FieldRule, GatewayError, ValidationErrors};
pub use gateway::{AccountsGateway, HttpAccountsGateway};
pub use slot::{AsyncOperationSlot, OperationForm, Rejection, SlotState, Submission};

#[cfg(test)]
#[path = "tests/fake_gateway.rs"]
mod fake_gateway;
