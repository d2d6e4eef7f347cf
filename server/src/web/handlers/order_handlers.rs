// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::models::{OrderAdminUpdate, PlaceOrderRequest};
use crate::services::order_service;
use crate::state::AppState;
use crate::store::OrderQuery;
use crate::web::dto::OrderResponse;
use crate::web::extractors::AuthenticatedUser;

#[instrument(
  name = "handler::place_order",
  skip(app_state, auth_user, req_payload),
  fields(customer_id = auth_user.account.id, lines = req_payload.items.len())
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let details = order_service::place_order(&app_state, &auth_user.account, req_payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(OrderResponse::from(details)))
}

#[instrument(name = "handler::list_orders", skip(app_state, auth_user), fields(account_id = auth_user.account.id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<OrderQuery>,
) -> Result<HttpResponse, AppError> {
  let orders = order_service::list_orders(&app_state, &auth_user.account, query.into_inner()).await?;
  let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
  Ok(HttpResponse::Ok().json(body))
}

#[instrument(name = "handler::recent_orders", skip(app_state, auth_user), fields(account_id = auth_user.account.id))]
pub async fn recent_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = order_service::recent_orders(&app_state, &auth_user.account).await?;
  let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
  Ok(HttpResponse::Ok().json(body))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(account_id = auth_user.account.id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let details = order_service::order_for(&app_state, &auth_user.account, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(OrderResponse::from(details)))
}

#[instrument(name = "handler::cancel_order", skip(app_state, auth_user), fields(account_id = auth_user.account.id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let details = order_service::cancel_order(&app_state, &auth_user.account, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(OrderResponse::from(details)))
}

#[instrument(name = "handler::update_order", skip(app_state, auth_user, req_payload), fields(account_id = auth_user.account.id))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  req_payload: web::Json<OrderAdminUpdate>,
) -> Result<HttpResponse, AppError> {
  let details =
    order_service::admin_update(&app_state, &auth_user.account, path.into_inner(), req_payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(OrderResponse::from(details)))
}
