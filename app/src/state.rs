// shopfront_app/src/state.rs

use shopfront::store::{AddressBook, Carts, Catalog, OrderStore};
use shopfront::{OrderCalculator, OrderService, ShipmentRegistrar, ShippingRateEstimator, ShopError};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::services::ShiprocketClient;

#[derive(Clone, Debug)]
pub struct AppState {
  pub orders: Arc<OrderService>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Wires the order service over a store implementing every storage port.
  /// Shiprocket, when configured, serves both live rates and shipment
  /// registration.
  pub fn build<S>(config: AppConfig, store: S) -> AppResult<Self>
  where
    S: Catalog + Carts + AddressBook + OrderStore + 'static,
  {
    let store = Arc::new(store);
    let carrier = config
      .shiprocket
      .clone()
      .map(|sr| ShiprocketClient::new(sr).map(Arc::new))
      .transpose()
      .map_err(ShopError::from)?;
    let estimator = carrier.clone().map(|c| c as Arc<dyn ShippingRateEstimator>);
    let registrar = carrier.map(|c| c as Arc<dyn ShipmentRegistrar>);

    let calculator = OrderCalculator::new(
      store.clone(),
      store.clone(),
      store.clone(),
      estimator,
      config.shipping.clone(),
    );
    let orders = OrderService::new(calculator, store, registrar)?;

    Ok(Self {
      orders: Arc::new(orders),
      config: Arc::new(config),
    })
  }
}
