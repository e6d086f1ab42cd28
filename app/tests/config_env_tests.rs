// tests/config_env_tests.rs

use serial_test::serial;
use shopfront_app::config::{AppConfig, LogFormat};
use std::env;

const VARS: [&str; 7] = [
  "DATABASE_URL",
  "SERVER_PORT",
  "SHIPROCKET_EMAIL",
  "SHIPROCKET_PASSWORD",
  "SHIPPING_ORIGIN_POSTCODE",
  "FREE_SHIPPING_THRESHOLD_CENTS",
  "LOG_FORMAT",
];

fn clear_vars() {
  for name in VARS {
    env::remove_var(name);
  }
}

#[test]
#[serial]
fn reads_process_environment() {
  clear_vars();
  env::set_var("DATABASE_URL", "postgres://shop@localhost/orders");
  env::set_var("SERVER_PORT", "9090");
  env::set_var("FREE_SHIPPING_THRESHOLD_CENTS", "75000");
  env::set_var("LOG_FORMAT", "JSON");

  let config = AppConfig::from_env().expect("config should load");
  assert_eq!(config.server_port, 9090);
  assert_eq!(config.shipping.free_shipping_threshold_cents, 75_000);
  assert_eq!(config.shipping.flat_fee_cents, 5_000);
  assert_eq!(config.log_format, LogFormat::Json);
  assert!(config.shiprocket.is_none());
  clear_vars();
}

#[test]
#[serial]
fn half_configured_carrier_is_rejected() {
  clear_vars();
  env::set_var("DATABASE_URL", "postgres://shop@localhost/orders");
  env::set_var("SHIPROCKET_EMAIL", "ops@example.com");

  let err = AppConfig::from_env().unwrap_err();
  assert!(err.to_string().contains("SHIPROCKET_EMAIL and SHIPROCKET_PASSWORD"));
  clear_vars();
}

#[test]
#[serial]
fn carrier_needs_an_origin_postcode() {
  clear_vars();
  env::set_var("DATABASE_URL", "postgres://shop@localhost/orders");
  env::set_var("SHIPROCKET_EMAIL", "ops@example.com");
  env::set_var("SHIPROCKET_PASSWORD", "secret");

  let err = AppConfig::from_env().unwrap_err();
  assert!(err.to_string().contains("SHIPPING_ORIGIN_POSTCODE is required"));

  env::set_var("SHIPPING_ORIGIN_POSTCODE", "110001");
  let config = AppConfig::from_env().expect("config should load");
  assert_eq!(config.shipping.origin_postcode, "110001");
  assert!(config.shiprocket.is_some());
  clear_vars();
}
