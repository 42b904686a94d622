//! Session orchestration and result storage for wager relays.
//!
//! Provides:
//! - `SessionRegistry` - At most one live runner per tenant
//! - `SessionRunner` - The repeat-until-stopped action loop
//! - `SessionController` - Create, start, stop and disconnect lifecycle
//! - Result log implementations (file, memory)

pub mod controller;
pub mod registry;
pub mod runner;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use controller::{ControllerError, SessionController, SessionStatus, StartAck, StopAck};
pub use registry::{RegistryError, RunnerHandle, SessionRegistry};
pub use runner::{
    RunReport, RunnerContext, RunnerError, RunnerSettings, RunnerState, SessionRunner,
};
