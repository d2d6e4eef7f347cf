// server/src/main.rs

use anyhow::Context;
use bazaar_server::config::{AppConfig, StoreBackend};
use bazaar_server::services::seed;
use bazaar_server::store::{MemoryStore, PgStore, Store};
use bazaar_server::{telemetry, web, AppState};

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;
  telemetry::init_tracing(app_config.log_format);
  tracing::info!(backend = ?app_config.store_backend, "Starting bazaar server...");

  let store: Arc<dyn Store> = match app_config.store_backend {
    StoreBackend::Postgres => {
      let url = app_config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres store")?;
      let pg = PgStore::connect(url, app_config.database_max_connections)
        .await
        .context("Failed to connect to the database")?;
      pg.migrate().await.context("Failed to apply database migrations")?;
      Arc::new(pg)
    }
    StoreBackend::Memory => {
      tracing::warn!("Using the in-memory store; data is lost on shutdown.");
      Arc::new(MemoryStore::new())
    }
  };

  if app_config.seed_db {
    seed::seed_reference_data(store.as_ref(), &app_config)
      .await
      .context("Failed to seed reference data")?;
  }

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = AppState::new(store, app_config);

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;
  Ok(())
}
