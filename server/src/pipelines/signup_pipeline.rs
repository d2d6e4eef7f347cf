// server/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::NewAccount;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use bazaar_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, warn, Level};

const MIN_PASSWORD_LEN: usize = 8;

/// Registers the account sign-up pipeline.
pub fn register_signup_pipeline(registry: &Arc<FlowRegistry<AppError>>) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_account", false, None),
    ("create_account", false, None),
  ]);

  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let form = ctx_data.read().registration.clone();

      event!(Level::DEBUG, email = %form.email, "Validating signup input.");
      if form.email.trim().is_empty() || !form.email.contains('@') {
        warn!("Invalid email format provided for signup.");
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
          "Password must be at least {} characters long.",
          MIN_PASSWORD_LEN
        )));
      }
      if form.password != form.confirm_password {
        return Err(AppError::Validation("Passwords do not match.".to_string()));
      }
      if form.first_name.trim().is_empty() {
        return Err(AppError::Validation("First name is required.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  signup_p.on_root("check_existing_account", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, store) = {
        let guard = ctx_data.read();
        (guard.registration.email.trim().to_string(), guard.store.clone())
      };

      if store.account_by_email(&email).await?.is_some() {
        warn!(%email, "Signup attempted with an existing email.");
        return Err(AppError::Validation("An account with this email already exists.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  // Hashing happens here so nothing is hashed for rejected input.
  signup_p.on_root("create_account", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (form, store) = {
        let guard = ctx_data.read();
        (guard.registration.clone(), guard.store.clone())
      };

      let password_hash = auth_service::hash_password(&form.password)?;
      let account = store
        .insert_account(NewAccount {
          email: form.email.trim().to_string(),
          password_hash,
          first_name: form.first_name.trim().to_string(),
          last_name: form.last_name.trim().to_string(),
          phone_number: form.phone_number,
          shipping_address: form.shipping_address,
          roles: form.account_type.initial_roles(),
        })
        .await?;

      info!(account_id = account.id, roles = ?account.roles, "Account created.");
      ctx_data.write().created_account = Some(account);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(signup_p);
  tracing::info!("Sign-up pipeline registered.");
}
