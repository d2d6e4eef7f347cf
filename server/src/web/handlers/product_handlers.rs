// server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{Account, NewProduct, NewProductImage, Product, ProductUpdate};
use crate::state::AppState;
use crate::store::{ProductOrdering, ProductQuery};
use crate::web::dto::ProductResponse;
use crate::web::extractors::AuthenticatedUser;

fn summaries(products: Vec<Product>) -> Vec<ProductResponse> {
  products.into_iter().map(ProductResponse::summary).collect()
}

/// Loads a product and checks that `account` is its seller.
async fn owned_product(app_state: &AppState, account: &Account, product_id: i64) -> Result<Product, AppError> {
  let product = app_state
    .store
    .product_by_id(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
  if product.seller_id != account.id {
    warn!(product_id, account_id = account.id, "Product change by non-owner.");
    return Err(AppError::Authorization(
      "Only the seller of this product can change it.".to_string(),
    ));
  }
  Ok(product)
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
  let products = app_state.store.list_products(&query).await?;
  Ok(HttpResponse::Ok().json(summaries(products)))
}

pub async fn featured_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let query = ProductQuery {
    is_featured: Some(true),
    ordering: ProductOrdering::CreatedDesc,
    ..ProductQuery::default()
  };
  let products = app_state.store.list_products(&query).await?;
  Ok(HttpResponse::Ok().json(summaries(products)))
}

pub async fn active_vendor_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.store.list_active_vendor_products().await?;
  Ok(HttpResponse::Ok().json(summaries(products)))
}

#[instrument(name = "handler::get_product", skip(app_state))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product = app_state
    .store
    .product_by_id(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
  let images = app_state.store.product_images(product_id).await?;
  Ok(HttpResponse::Ok().json(ProductResponse::detailed(product, images)))
}

#[instrument(
  name = "handler::create_product",
  skip(app_state, auth_user, req_payload),
  fields(seller_id = auth_user.account.id, slug = %req_payload.slug)
)]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  if !auth_user.account.is_seller() {
    return Err(AppError::Authorization("Only sellers can create products.".to_string()));
  }
  let mut new_product = req_payload.into_inner();
  new_product.validate()?;
  new_product.seller_id = auth_user.account.id;

  let product = app_state.store.insert_product(new_product).await?;
  info!(product_id = product.id, "Product created.");
  Ok(HttpResponse::Created().json(ProductResponse::detailed(product, Vec::new())))
}

#[instrument(name = "handler::update_product", skip(app_state, auth_user, req_payload), fields(account_id = auth_user.account.id))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  req_payload: web::Json<ProductUpdate>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let update = req_payload.into_inner();
  update.validate()?;
  owned_product(&app_state, &auth_user.account, product_id).await?;

  let product = app_state.store.update_product(product_id, &update).await?;
  let images = app_state.store.product_images(product_id).await?;
  Ok(HttpResponse::Ok().json(ProductResponse::detailed(product, images)))
}

#[instrument(name = "handler::delete_product", skip(app_state, auth_user), fields(account_id = auth_user.account.id))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  owned_product(&app_state, &auth_user.account, product_id).await?;
  app_state.store.delete_product(product_id).await?;
  info!(product_id, "Product deleted.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::add_product_image", skip(app_state, auth_user, req_payload), fields(account_id = auth_user.account.id))]
pub async fn add_product_image_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  req_payload: web::Json<NewProductImage>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let new_image = req_payload.into_inner();
  if new_image.image_url.trim().is_empty() {
    return Err(AppError::Validation("Image URL cannot be blank.".to_string()));
  }
  owned_product(&app_state, &auth_user.account, product_id).await?;
  let image = app_state.store.insert_product_image(product_id, new_image).await?;
  Ok(HttpResponse::Created().json(image))
}
