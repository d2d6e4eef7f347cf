// server/src/web/handlers/catalog_handlers.rs

//! Categories and brands.

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::{NewBrand, NewCategory};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.store.list_categories().await?))
}

#[instrument(name = "handler::create_category", skip_all, fields(account_id = auth_user.account.id))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<NewCategory>,
) -> Result<HttpResponse, AppError> {
  let new_category = req_payload.into_inner();
  if new_category.name.trim().is_empty() || new_category.slug.trim().is_empty() {
    return Err(AppError::Validation("Category name and slug are required.".to_string()));
  }
  let category = app_state.store.insert_category(new_category).await?;
  info!(category_id = category.id, "Category created.");
  Ok(HttpResponse::Created().json(category))
}

pub async fn list_brands_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.store.list_brands().await?))
}

#[instrument(name = "handler::create_brand", skip_all, fields(account_id = auth_user.account.id))]
pub async fn create_brand_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<NewBrand>,
) -> Result<HttpResponse, AppError> {
  let new_brand = req_payload.into_inner();
  if new_brand.name.trim().is_empty() {
    return Err(AppError::Validation("Brand name is required.".to_string()));
  }
  let brand = app_state.store.insert_brand(new_brand).await?;
  info!(brand_id = brand.id, "Brand created.");
  Ok(HttpResponse::Created().json(brand))
}
