//! Action results and their summary projection.

use std::fmt;

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::Value;

use crate::traits::ActionError;

/// Timestamp layout used in summary lines.
const SUMMARY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of one successful remote action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    /// Balance snapshot after the action.
    pub balance: f64,
    /// Whether the action hit the favorable outcome.
    pub favorable: bool,
    /// Full response body.
    pub raw: Value,
}

#[derive(Deserialize)]
struct ResponseShape {
    user: UserShape,
    dice: DiceShape,
}

#[derive(Deserialize)]
struct UserShape {
    real_balance: f64,
}

#[derive(Deserialize)]
struct DiceShape {
    is_win: bool,
}

impl ActionResult {
    /// Build a result from a response body.
    ///
    /// The body must carry `user.real_balance` and `dice.is_win`; any other
    /// fields are kept untouched in `raw`.
    ///
    /// # Errors
    /// Returns `ActionError::MalformedResponse` if either field is missing
    /// or has the wrong type.
    pub fn from_response(raw: Value) -> Result<Self, ActionError> {
        let shape = ResponseShape::deserialize(&raw)
            .map_err(|e| ActionError::MalformedResponse(e.to_string()))?;
        Ok(Self {
            balance: shape.user.real_balance,
            favorable: shape.dice.is_win,
            raw,
        })
    }

    /// Project this result into a summary stamped with the current local time.
    #[must_use]
    pub fn summarize(&self) -> ActionSummary {
        ActionSummary {
            timestamp: Local::now(),
            balance: self.balance,
            favorable: self.favorable,
        }
    }
}

/// Timestamped summary line for the secondary log.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSummary {
    pub timestamp: DateTime<Local>,
    pub balance: f64,
    pub favorable: bool,
}

impl fmt::Display for ActionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Balance: {:.2} | Win: {}",
            self.timestamp.format(SUMMARY_TIME_FORMAT),
            self.balance,
            self.favorable
        )
    }
}
