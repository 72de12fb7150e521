use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error};
use serde_json::json;

use crate::model::balance::BalancePool;

#[derive(Debug, Display, Error)]
pub enum LeaveError {
    /// Malformed input: bad date order, unknown enum value, bad balance.
    #[display(fmt = "{}", message)]
    Validation { message: String },

    /// The acting user lacks the role for the requested operation.
    #[display(fmt = "{}", message)]
    Authorization { message: String },

    /// Lifecycle transition attempted from a terminal state.
    #[display(fmt = "{}", message)]
    InvalidTransition { message: String },

    #[display(
        fmt = "insufficient {} leave balance: {} day(s) available, {} requested",
        pool,
        available,
        requested
    )]
    InsufficientBalance {
        pool: BalancePool,
        available: f64,
        requested: f64,
    },

    #[display(fmt = "{} {} not found", entity, id)]
    NotFound { entity: &'static str, id: String },

    #[display(fmt = "record store failure: {}", source)]
    Store { source: sqlx::Error },

    /// Identity provider failure (bad credentials, expired token, ...).
    #[display(fmt = "{}", message)]
    Auth { message: String },
}

impl LeaveError {
    pub fn validation(message: impl Into<String>) -> Self {
        LeaveError::Validation {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        LeaveError::Authorization {
            message: message.into(),
        }
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        LeaveError::InvalidTransition {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LeaveError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        LeaveError::Auth {
            message: message.into(),
        }
    }

    /// Stable machine-readable kind, returned as `error` in JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LeaveError::Validation { .. } => "validation_error",
            LeaveError::Authorization { .. } => "authorization_error",
            LeaveError::InvalidTransition { .. } => "invalid_transition",
            LeaveError::InsufficientBalance { .. } => "insufficient_balance",
            LeaveError::NotFound { .. } => "not_found",
            LeaveError::Store { .. } => "store_error",
            LeaveError::Auth { .. } => "auth_error",
        }
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(source: sqlx::Error) -> Self {
        LeaveError::Store { source }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation { .. } => StatusCode::BAD_REQUEST,
            LeaveError::Authorization { .. } => StatusCode::FORBIDDEN,
            LeaveError::InvalidTransition { .. } => StatusCode::CONFLICT,
            LeaveError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LeaveError::NotFound { .. } => StatusCode::NOT_FOUND,
            LeaveError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LeaveError::Auth { .. } => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            LeaveError::Store { source } => {
                tracing::error!(error = %source, "Record store failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message
        }))
    }
}
