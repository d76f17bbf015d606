// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

/// Failure reported by a collaborator call. Never retried by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport failure, including expired sessions surfaced by the transport.
    Network(String),
    Validation(String),
    Conflict(String),
    NotFound(String),
}

impl ApiError {
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Network(_) => "network error",
            Self::Validation(_) => "validation error",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not found",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Network(message)
            | Self::Validation(message)
            | Self::Conflict(message)
            | Self::NotFound(message) => message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind_label(), self.message())
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    InvalidConfig(String),
    /// A delete check for `pending` is in flight or awaiting confirmation.
    GuardBusy {
        pending: String,
        requested: String,
    },
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    Api(ApiError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(message) => write!(f, "invalid view config: {message}"),
            Self::GuardBusy { pending, requested } => write!(
                f,
                "delete of {pending:?} is still pending; confirm or cancel it before checking {requested:?}"
            ),
            Self::InvalidState { operation, state } => {
                write!(f, "{operation} is not allowed while the delete guard is {state}")
            }
            Self::Api(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ApiError> for CoreError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::{ApiError, CoreError};

    #[test]
    fn api_errors_render_kind_and_message() {
        let error = ApiError::Conflict("device dev1 already exists".to_owned());
        assert_eq!(error.to_string(), "conflict: device dev1 already exists");
    }

    #[test]
    fn guard_busy_names_both_ids() {
        let message = CoreError::GuardBusy {
            pending: "dev1".to_owned(),
            requested: "dev2".to_owned(),
        }
        .to_string();
        assert!(message.contains("\"dev1\""));
        assert!(message.contains("\"dev2\""));
        assert!(message.contains("confirm or cancel"));
    }
}
