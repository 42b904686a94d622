//! Control surface and messaging transport for wager relays.
//!
//! Provides:
//! - Control protocol (JSON request/response bodies)
//! - HTTP control router (feature: http)
//! - Telegram connector (feature: telegram)

pub mod protocol;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "telegram")]
pub mod telegram;

pub use protocol::{ControlRequest, ControlResponse, HealthResponse};

#[cfg(feature = "http")]
pub use http::control_router;

#[cfg(feature = "telegram")]
pub use telegram::TelegramConnector;
