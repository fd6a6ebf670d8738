//! Order registry errors

use meridian_core::LocalOrderId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Order not found: {0}")]
    OrderNotFound(LocalOrderId),

    #[error("Exchange order {exchange_id} is bound to {bound}, cannot bind it to {requested}")]
    ExchangeIdConflict {
        exchange_id: String,
        bound: String,
        requested: String,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
