// shopfront_app/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use shopfront::ShippingPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  #[default]
  Pretty,
  Json,
}

/// Credentials for the Shiprocket carrier API. Present only when both email
/// and password are configured.
#[derive(Clone)]
pub struct ShiprocketConfig {
  pub base_url: String,
  pub email: String,
  pub password: String,
  pub pickup_location: String,
  /// Upper bound on each carrier HTTP call.
  pub request_timeout: Duration,
}

impl std::fmt::Debug for ShiprocketConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ShiprocketConfig")
      .field("base_url", &self.base_url)
      .field("email", &self.email)
      .field("password", &"[REDACTED]")
      .field("pickup_location", &self.pickup_location)
      .field("request_timeout", &self.request_timeout)
      .finish()
  }
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  pub run_migrations: bool,
  pub shipping: ShippingPolicy,
  pub shiprocket: Option<ShiprocketConfig>,
  pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("database_max_connections", &self.database_max_connections)
      .field("run_migrations", &self.run_migrations)
      .field("shipping", &self.shipping)
      .field("shiprocket", &self.shiprocket)
      .field("log_format", &self.log_format)
      .finish()
  }
}

fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
    None => Ok(default),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source. `from_env` passes the
  /// process environment; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_var("SERVER_PORT", get("SERVER_PORT"), 8080u16)?;
    let database_url = get("DATABASE_URL")
      .ok_or_else(|| AppError::Config("Missing environment variable 'DATABASE_URL'".to_string()))?;
    let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS"), 10u32)?;
    let run_migrations = parse_var("RUN_MIGRATIONS", get("RUN_MIGRATIONS"), true)?;

    let defaults = ShippingPolicy::default();
    let shipping = ShippingPolicy {
      origin_postcode: get("SHIPPING_ORIGIN_POSTCODE").unwrap_or(defaults.origin_postcode),
      free_shipping_threshold_cents: parse_var(
        "FREE_SHIPPING_THRESHOLD_CENTS",
        get("FREE_SHIPPING_THRESHOLD_CENTS"),
        defaults.free_shipping_threshold_cents,
      )?,
      flat_fee_cents: parse_var(
        "FLAT_SHIPPING_FEE_CENTS",
        get("FLAT_SHIPPING_FEE_CENTS"),
        defaults.flat_fee_cents,
      )?,
    };
    if shipping.free_shipping_threshold_cents < 0 || shipping.flat_fee_cents < 0 {
      return Err(AppError::Config("Shipping amounts must not be negative".to_string()));
    }

    let shiprocket = match (get("SHIPROCKET_EMAIL"), get("SHIPROCKET_PASSWORD")) {
      (Some(email), Some(password)) => Some(ShiprocketConfig {
        base_url: get("SHIPROCKET_BASE_URL")
          .unwrap_or_else(|| "https://apiv2.shiprocket.in".to_string())
          .trim_end_matches('/')
          .to_string(),
        email,
        password,
        pickup_location: get("SHIPROCKET_PICKUP_LOCATION").unwrap_or_else(|| "Primary".to_string()),
        request_timeout: Duration::from_secs(parse_var(
          "SHIPROCKET_TIMEOUT_SECS",
          get("SHIPROCKET_TIMEOUT_SECS"),
          10u64,
        )?),
      }),
      (None, None) => None,
      _ => {
        return Err(AppError::Config(
          "SHIPROCKET_EMAIL and SHIPROCKET_PASSWORD must be set together".to_string(),
        ))
      }
    };

    if shiprocket.is_some() && shipping.origin_postcode.trim().is_empty() {
      return Err(AppError::Config(
        "SHIPPING_ORIGIN_POSTCODE is required when Shiprocket is enabled".to_string(),
      ));
    }

    let log_format = match get("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
      None | Some("pretty") | Some("text") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT: {}", other))),
    };

    tracing::info!(shiprocket_enabled = shiprocket.is_some(), "Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      run_migrations,
      shipping,
      shiprocket,
      log_format,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn defaults_apply_when_only_database_is_set() {
    let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/shop")])).unwrap();
    assert_eq!(config.bind_address(), "127.0.0.1:8080");
    assert_eq!(config.shipping, ShippingPolicy::default());
    assert!(config.shiprocket.is_none());
    assert!(config.run_migrations);
    assert_eq!(config.log_format, LogFormat::Pretty);
  }

  #[test]
  fn missing_database_url_is_a_config_error() {
    let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
  }

  #[test]
  fn shipping_policy_and_carrier_come_from_env() {
    let config = AppConfig::from_lookup(lookup(&[
      ("DATABASE_URL", "postgres://localhost/shop"),
      ("SHIPPING_ORIGIN_POSTCODE", "110001"),
      ("FREE_SHIPPING_THRESHOLD_CENTS", "99900"),
      ("FLAT_SHIPPING_FEE_CENTS", "4900"),
      ("SHIPROCKET_EMAIL", "ops@example.com"),
      ("SHIPROCKET_PASSWORD", "secret"),
      ("SHIPROCKET_BASE_URL", "http://localhost:9000/"),
      ("LOG_FORMAT", "JSON"),
    ]))
    .unwrap();

    assert_eq!(config.shipping.origin_postcode, "110001");
    assert_eq!(config.shipping.free_shipping_threshold_cents, 99_900);
    assert_eq!(config.shipping.flat_fee_cents, 4_900);
    let shiprocket = config.shiprocket.as_ref().unwrap();
    assert_eq!(shiprocket.base_url, "http://localhost:9000");
    assert_eq!(shiprocket.pickup_location, "Primary");
    assert_eq!(shiprocket.request_timeout, Duration::from_secs(10));
    assert_eq!(config.log_format, LogFormat::Json);
    assert!(!format!("{:?}", config).contains("secret"));
  }

  #[test]
  fn half_configured_carrier_is_rejected() {
    let err = AppConfig::from_lookup(lookup(&[
      ("DATABASE_URL", "postgres://localhost/shop"),
      ("SHIPROCKET_EMAIL", "ops@example.com"),
    ]))
    .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
  }

  #[test]
  fn carrier_without_origin_postcode_is_rejected() {
    let err = AppConfig::from_lookup(lookup(&[
      ("DATABASE_URL", "postgres://localhost/shop"),
      ("SHIPROCKET_EMAIL", "ops@example.com"),
      ("SHIPROCKET_PASSWORD", "secret"),
      ("SHIPPING_ORIGIN_POSTCODE", "   "),
    ]))
    .unwrap_err();
    assert!(matches!(err, AppError::Config(ref m) if m.contains("SHIPPING_ORIGIN_POSTCODE")));
  }

  #[test]
  fn bad_numbers_are_rejected() {
    let err = AppConfig::from_lookup(lookup(&[
      ("DATABASE_URL", "postgres://localhost/shop"),
      ("SERVER_PORT", "eighty"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("SERVER_PORT"));
  }
}
