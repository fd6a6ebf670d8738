mod account;
mod contract;
mod direction;
mod log;
mod order;
mod order_status;
mod order_type;
mod requests;
mod trade;

pub use account::Account;
pub use contract::{Contract, Product};
pub use direction::Direction;
pub use log::{LogLevel, LogRecord};
pub use order::{LocalOrderId, Order};
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use requests::{CancelRequest, OrderRequest, SubscribeRequest};
pub use trade::Trade;
