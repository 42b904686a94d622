//! Core types and collaborator traits for wager relay sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `TenantId` / `ChatId` - Who a session belongs to and where it reports
//! - `ActionProfile` - Fixed request profile with rotating payload variants
//! - `ActionResult` / `ActionSummary` - Per-action outcome and its log projection
//! - `Command` - Messaging-channel commands
//! - Client, log, messenger and connector traits

pub mod action;
pub mod command;
pub mod profile;
pub mod tenant;
pub mod traits;

pub use action::{ActionResult, ActionSummary};
pub use command::{Command, IncomingCommand};
pub use profile::{ActionProfile, WagerPayload};
pub use tenant::{ChatId, TenantId};
pub use traits::{ActionClient, Connector, Messenger, ResultLog};
