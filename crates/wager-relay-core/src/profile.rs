//! Fixed request profile for the remote action API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One wager configuration sent as the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagerPayload {
    pub point_milestone: u32,
    pub is_upper: bool,
    pub bet_amount: f64,
    pub currency: String,
}

impl Default for WagerPayload {
    fn default() -> Self {
        Self {
            point_milestone: 97,
            is_upper: true,
            bet_amount: 3.0,
            currency: "goat".to_string(),
        }
    }
}

/// Profile error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Action profile has no payload variants")]
    NoPayloads,
    #[error("Action profile has no target url")]
    MissingUrl,
}

/// Target, headers and payload rotation shared by every action.
///
/// Payloads are selected round-robin: request `i` uses variant `i mod N`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionProfile {
    /// Endpoint receiving the POST.
    pub url: String,

    /// Fixed headers, including credentials.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Payload variants in rotation order.
    pub payloads: Vec<WagerPayload>,
}

impl ActionProfile {
    /// Create a profile with no extra headers.
    ///
    /// # Errors
    /// Returns error if `url` is blank or `payloads` is empty.
    pub fn new(url: impl Into<String>, payloads: Vec<WagerPayload>) -> Result<Self, ProfileError> {
        let profile = Self {
            url: url.into(),
            headers: BTreeMap::new(),
            payloads,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check the invariants a deserialized profile may violate.
    ///
    /// # Errors
    /// Returns error if `url` is blank or `payloads` is empty.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.url.trim().is_empty() {
            return Err(ProfileError::MissingUrl);
        }
        if self.payloads.is_empty() {
            return Err(ProfileError::NoPayloads);
        }
        Ok(())
    }

    /// Payload for the `index`-th request, or `None` if the rotation is empty.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn variant(&self, index: u64) -> Option<&WagerPayload> {
        let slot = index.checked_rem(self.payloads.len() as u64)?;
        self.payloads.get(slot as usize)
    }

    /// Number of payload variants.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.payloads.len()
    }
}
