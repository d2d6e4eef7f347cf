// server/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use bazaar_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Insufficient stock for product '{product_name}' ({product_id}): requested {requested}, available {available}")]
  InsufficientStock {
    product_id: i64,
    product_name: String,
    available: i32,
    requested: i64,
  },

  #[error("Invalid State Transition: {0}")]
  InvalidStateTransition(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Not Allowed: {0}")]
  Authorization(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  #[error("Pipeline execution was halted by a handler.")]
  PipelineHaltedByHandler,
}

impl AppError {
  /// Machine-readable error kind sent alongside the message.
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "validation_error",
      AppError::InsufficientStock { .. } => "insufficient_stock",
      AppError::InvalidStateTransition(_) => "invalid_state_transition",
      AppError::Auth(_) => "authentication_error",
      AppError::Authorization(_) => "authorization_error",
      AppError::NotFound(_) => "not_found",
      AppError::Conflict(_) => "conflict",
      AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_)
      | AppError::PipelineHaltedByHandler => "internal_error",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::InsufficientStock { .. } | AppError::InvalidStateTransition(_) => {
        StatusCode::BAD_REQUEST
      }
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Authorization(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }
    let kind = self.kind();
    let body = match self {
      AppError::Validation(m)
      | AppError::InvalidStateTransition(m)
      | AppError::Auth(m)
      | AppError::Authorization(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m) => json!({"error": m, "kind": kind}),
      AppError::InsufficientStock {
        product_id,
        product_name,
        available,
        requested,
      } => json!({
        "error": format!("Insufficient stock for product '{}'", product_name),
        "kind": kind,
        "product_id": product_id,
        "product": product_name,
        "available": available,
        "requested": requested,
      }),
      AppError::Config(_) => json!({"error": "Configuration issue", "kind": kind}),
      AppError::Sqlx(_) => json!({"error": "Database operation failed", "kind": kind}),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        json!({"error": "Workflow processing error", "kind": kind})
      }
      AppError::Internal(_) | AppError::PipelineHaltedByHandler => {
        json!({"error": "An internal error occurred", "kind": kind})
      }
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
