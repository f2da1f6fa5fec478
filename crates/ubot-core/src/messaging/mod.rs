//! Outbound messaging abstractions (Telegram today; other gateways behind the same port).

pub mod port;
pub mod types;
