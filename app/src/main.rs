// shopfront_app/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use shopfront_app::config::AppConfig;
use shopfront_app::db::{self, PgStore};
use shopfront_app::state::AppState;
use shopfront_app::web::configure_app_routes;
use shopfront_app::init_tracing;
use std::io;

fn startup_error(stage: &str, err: impl std::fmt::Display) -> io::Error {
  tracing::error!(error = %err, "{stage} failed.");
  io::Error::new(io::ErrorKind::Other, format!("{stage}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  let app_config = AppConfig::from_env().map_err(|e| {
    eprintln!("Configuration error: {e}");
    io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
  })?;
  init_tracing(app_config.log_format);
  tracing::info!(config = ?app_config, "Starting shopfront order server...");

  let pool = db::connect(&app_config)
    .await
    .map_err(|e| startup_error("Database setup", e))?;

  let server_address = app_config.bind_address();
  let app_state = AppState::build(app_config, PgStore::new(pool)).map_err(|e| startup_error("Service wiring", e))?;
  tracing::info!("Order service ready; binding {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
