// server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{ProfileUpdate, Registration};
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::dto::SessionResponse;
use crate::web::extractors::AuthenticatedUser;
use bazaar_flow::{ContextData, PipelineResult};

#[derive(Deserialize)]
pub struct LoginRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(
  name = "handler::register",
  skip(app_state, req_payload),
  fields(req_email = %req_payload.email, account_type = ?req_payload.account_type)
)]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<Registration>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(SignupCtxData {
    store: app_state.store.clone(),
    registration: req_payload.into_inner(),
    created_account: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let account = ctx_data.read().created_account.clone().ok_or_else(|| {
        warn!("Signup pipeline completed without an account.");
        AppError::Internal("Signup completed without creating an account.".to_string())
      })?;
      info!(account_id = account.id, "Registration successful.");
      Ok(HttpResponse::Created().json(account))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signup pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => {
      warn!(error = %app_err, "Signup pipeline failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let LoginRequestPayload { email, password } = req_payload.into_inner();
  let ctx_data = ContextData::new(SigninCtxData {
    store: app_state.store.clone(),
    email,
    password,
    session_ttl_hours: app_state.config.session_ttl_hours,
    account: None,
    session: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (account, session) = {
        let guard = ctx_data.read();
        (guard.account.clone(), guard.session.clone())
      };
      match (account, session) {
        (Some(account), Some(session)) => {
          info!(account_id = account.id, "Sign-in successful.");
          Ok(HttpResponse::Ok().json(SessionResponse::new(session, account)))
        }
        _ => {
          warn!("Sign-in pipeline completed without a session.");
          Err(AppError::Internal("Sign-in completed without issuing a session.".to_string()))
        }
      }
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Sign-in pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => {
      warn!(error = %app_err, "Sign-in pipeline failed.");
      Err(app_err)
    }
  }
}

/// Swaps the presented token for a fresh one.
#[instrument(name = "handler::refresh", skip_all, fields(account_id = auth_user.account.id))]
pub async fn refresh_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.store.revoke_session(auth_user.token).await?;
  let session = auth_service::issue_session(
    app_state.store.as_ref(),
    auth_user.account.id,
    app_state.config.session_ttl_hours,
  )
  .await?;
  Ok(HttpResponse::Ok().json(SessionResponse::new(session, auth_user.account)))
}

#[instrument(name = "handler::logout", skip_all, fields(account_id = auth_user.account.id))]
pub async fn logout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.store.revoke_session(auth_user.token).await?;
  info!("Session revoked.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Successfully logged out." })))
}

pub async fn get_profile_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(auth_user.account))
}

/// Partial profile update. Unknown fields, `email` included, are rejected by deserialization.
#[instrument(name = "handler::update_profile", skip_all, fields(account_id = auth_user.account.id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
  let update = req_payload.into_inner();
  if update.first_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
    return Err(AppError::Validation("First name cannot be blank.".to_string()));
  }
  let account = app_state.store.update_profile(auth_user.account.id, &update).await?;
  Ok(HttpResponse::Ok().json(account))
}
