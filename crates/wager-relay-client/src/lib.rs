//! HTTP client for the remote wager action API.
//!
//! Provides:
//! - `HttpActionClient` - `ActionClient` over a fixed `ActionProfile`

pub mod http;

pub use http::{ClientBuildError, HttpActionClient};
