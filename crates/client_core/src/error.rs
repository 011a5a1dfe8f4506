use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}: {message}")]
    Status {
        url: String,
        status: StatusCode,
        message: String,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid api url {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } | Self::Decode { source, .. } => source.status(),
            Self::InvalidUrl(_) | Self::Other(_) => None,
        }
    }
}

/// Turns a failure into operator-facing text, falling back to `default` when
/// the error carries nothing readable.
pub fn feedback_message(err: &GatewayError, default: &str) -> String {
    let message = match err {
        GatewayError::Status { message, .. } => message.trim().to_string(),
        other => other.to_string(),
    };
    if message.is_empty() {
        default.to_string()
    } else {
        message
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    Min(String),
    Max(String),
    MaxLength(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub rule: FieldRule,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            FieldRule::Required => write!(f, "{} is required", self.field),
            FieldRule::Min(min) => write!(f, "{} must be at least {min}", self.field),
            FieldRule::Max(max) => write!(f, "{} must be at most {max}", self.field),
            FieldRule::MaxLength(len) => {
                write!(f, "{} must be at most {len} characters", self.field)
            }
        }
    }
}

/// Per-field messages collected while validating a form. Never reaches the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("invalid form: {}", .errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, rule: FieldRule) {
        self.errors.push(FieldError { field, rule });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages_for(&self, field: &str) -> Vec<String> {
        self.errors
            .iter()
            .filter(|err| err.field == field)
            .map(ToString::to_string)
            .collect()
    }

    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}
