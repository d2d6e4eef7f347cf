// server/src/web/extractors.rs

use crate::errors::AppError;
use crate::models::Account;
use crate::services::auth_service;
use crate::state::AppState;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;
use uuid::Uuid;

/// The caller behind `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub account: Account,
  pub token: Uuid,
}

fn bearer_token(req: &HttpRequest) -> Result<Uuid, AppError> {
  let value = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| AppError::Auth("Authentication credentials were not provided.".to_string()))?;

  value
    .strip_prefix("Bearer ")
    .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    .ok_or_else(|| {
      warn!("Malformed Authorization header.");
      AppError::Auth("Invalid or expired session token.".to_string())
    })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);

    Box::pin(async move {
      let state = state.ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
      let (session, account) = auth_service::authenticate(state.store.as_ref(), token?).await?;
      Ok(AuthenticatedUser {
        account,
        token: session.token,
      })
    })
  }
}
