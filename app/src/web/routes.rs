// shopfront_app/src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::order_handlers;

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Malformed bodies and queries answer with the usual `{"error": ...}` shape.
  let json_config =
    web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into());
  let query_config =
    web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into());

  cfg.service(
    web::scope("/api/v1")
      .app_data(json_config)
      .app_data(query_config)
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("/quote", web::post().to(order_handlers::quote_order_handler))
          .route("/create", web::post().to(order_handlers::create_order_handler))
          .route(
            "/update-order-status/{orderId}",
            web::put().to(order_handlers::update_order_status_handler),
          )
          .route("/cancel-order", web::put().to(order_handlers::cancel_order_handler))
          .route(
            "/get-orders-by-user-id",
            web::get().to(order_handlers::orders_by_user_handler),
          )
          .route("/get-all-orders", web::get().to(order_handlers::all_orders_handler))
          // Last, so the fixed segments above win.
          .route("/{orderId}", web::get().to(order_handlers::get_order_handler)),
      ),
  );
}
