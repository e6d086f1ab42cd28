// shopfront_app/src/services/mod.rs

pub mod shiprocket;

pub use shiprocket::ShiprocketClient;
