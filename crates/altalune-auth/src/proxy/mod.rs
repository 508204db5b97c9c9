//! Token-Exchange Proxy

pub mod exchange_api;

pub use exchange_api::{exchange_router, ExchangeState};
