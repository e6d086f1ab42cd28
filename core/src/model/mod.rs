// shopfront/src/model/mod.rs

//! Domain records shared by the calculator, the status machine and the stores.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;

pub use address::Address;
pub use cart::CartItem;
pub use order::{
  Actor, ActorRole, CheckoutType, Order, OrderItem, OrderStatus, PaymentMode, PaymentStatus, StatusHistoryEntry,
  UnknownStatus,
};
pub use product::{Dimensions, OfferWindow, Product, ProductVariant};
