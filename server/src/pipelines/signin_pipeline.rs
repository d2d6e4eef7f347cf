// server/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use bazaar_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, warn, Level};

fn invalid_credentials() -> AppError {
  AppError::Auth("Invalid email or password".to_string())
}

/// Registers the sign-in pipeline. Unknown emails and wrong passwords fail
/// with the same message.
pub fn register_signin_pipeline(registry: &Arc<FlowRegistry<AppError>>) {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_account_by_email", false, None),
    ("verify_account_password", false, None),
    ("check_account_active", false, None),
    ("issue_session_token", false, None),
  ]);

  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, password_is_empty) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.password.is_empty())
      };

      event!(Level::DEBUG, email = %email, "Validating sign-in input.");
      if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if password_is_empty {
        return Err(AppError::Validation("Password is required.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  signin_p.on_root("fetch_account_by_email", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, store) = {
        let guard = ctx_data.read();
        (guard.email.trim().to_string(), guard.store.clone())
      };

      match store.account_by_email(&email).await? {
        Some(account) => {
          event!(Level::DEBUG, account_id = account.id, "Account found for sign-in.");
          ctx_data.write().account = Some(account);
          Ok(PipelineControl::Continue)
        }
        None => {
          warn!(%email, "Sign-in for unknown email.");
          Err(invalid_credentials())
        }
      }
    })
  });

  signin_p.on_root("verify_account_password", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (stored_hash, password, account_id) = {
        let guard = ctx_data.read();
        let account = guard
          .account
          .as_ref()
          .ok_or_else(|| AppError::Internal("Account missing before password check.".to_string()))?;
        (account.password_hash.clone(), guard.password.clone(), account.id)
      };

      if !auth_service::verify_password(&stored_hash, &password)? {
        warn!(account_id, "Password mismatch on sign-in.");
        return Err(invalid_credentials());
      }
      Ok(PipelineControl::Continue)
    })
  });

  signin_p.on_root("check_account_active", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let active = ctx_data.read().account.as_ref().is_some_and(|a| a.is_active);
      if !active {
        warn!("Sign-in attempted on a deactivated account.");
        return Err(AppError::Auth("Account is disabled".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  signin_p.on_root("issue_session_token", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (store, account_id, ttl_hours) = {
        let guard = ctx_data.read();
        let account_id = guard
          .account
          .as_ref()
          .map(|a| a.id)
          .ok_or_else(|| AppError::Internal("Account missing before issuing a session.".to_string()))?;
        (guard.store.clone(), account_id, guard.session_ttl_hours)
      };

      let session = auth_service::issue_session(store.as_ref(), account_id, ttl_hours).await?;
      ctx_data.write().session = Some(session);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(signin_p);
  tracing::info!("Sign-in pipeline registered.");
}
