// server/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{auth_handlers, catalog_handlers, order_handlers, product_handlers};
use actix_web::{web, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed bodies and query strings answer like any other validation failure.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(
      web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
      web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/refresh", web::post().to(auth_handlers::refresh_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/profile", web::get().to(auth_handlers::get_profile_handler))
          .route("/profile", web::patch().to(auth_handlers::update_profile_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("", web::post().to(product_handlers::create_product_handler))
          // Literal segments are registered before `/{product_id}`.
          .route("/featured", web::get().to(product_handlers::featured_products_handler))
          .route("/active-vendor", web::get().to(product_handlers::active_vendor_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route("/{product_id}", web::patch().to(product_handlers::update_product_handler))
          .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler))
          .route("/{product_id}/images", web::post().to(product_handlers::add_product_image_handler)),
      )
      .service(
        web::scope("/categories")
          .route("", web::get().to(catalog_handlers::list_categories_handler))
          .route("", web::post().to(catalog_handlers::create_category_handler)),
      )
      .service(
        web::scope("/brands")
          .route("", web::get().to(catalog_handlers::list_brands_handler))
          .route("", web::post().to(catalog_handlers::create_brand_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::place_order_handler))
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/recent", web::get().to(order_handlers::recent_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}", web::patch().to(order_handlers::update_order_handler))
          .route("/{order_id}/cancel", web::patch().to(order_handlers::cancel_order_handler)),
      ),
  );
}
