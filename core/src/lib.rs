// src/lib.rs

//! Shopfront: order pricing, shipping quotes and the order status workflow
//! for a multi-category storefront.
//!
//!  - [`calculator`] prices a cart or a single "buy now" product, including
//!    time-boxed discounts, weight and shipping.
//!  - [`status`] holds the order status graph and applies transitions.
//!  - [`orders`] places orders through a step [`pipeline`] and runs status
//!    changes and cancellations against an [`store::OrderStore`].
//!
//! Persistence and carriers sit behind async traits in [`store`] and
//! [`shipping`]; [`store::MemoryStore`] implements every storage port in memory.

pub mod calculator;
pub mod error;
pub mod model;
pub mod orders;
pub mod pipeline;
pub mod pricing;
pub mod shipping;
pub mod status;
pub mod store;

pub use crate::calculator::{OrderCalculator, OrderQuote, QuoteLine, QuoteRequest, QuoteSummary};
pub use crate::error::{PipelineError, ShopError, ShopResult};
pub use crate::orders::{OrderService, PlaceOrderRequest};
pub use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult};
pub use crate::shipping::{
  CourierRate, RateQuote, ShipmentReceipt, ShipmentRegistrar, ShippingPolicy, ShippingRateEstimator,
  ShippingRateRequest,
};
pub use crate::status::{TransitionCheck, TransitionOutcome};
pub use crate::store::{
  AddressBook, Carts, Catalog, MemoryStore, OrderFilter, OrderPage, OrderStore,
  PricedCartItem,
};
