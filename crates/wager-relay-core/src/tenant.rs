//! Tenant identity and messaging chat identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of leading token characters kept when displaying an identity.
const VISIBLE_PREFIX: usize = 6;

/// Opaque token identifying one external account.
///
/// The token doubles as a bot credential, so `Display` and `Debug`
/// only ever show a short prefix. Use [`TenantId::as_str`] when the
/// raw value is needed to open a connection.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

/// Rejected tenant token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TenantIdError {
    #[error("Bot token is required")]
    Empty,
}

impl TenantId {
    /// Parse a token, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns error if the token is empty after trimming.
    pub fn parse(token: impl AsRef<str>) -> Result<Self, TenantIdError> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(TenantIdError::Empty);
        }
        Ok(Self(token.to_string()))
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(VISIBLE_PREFIX).collect();
        if prefix.len() < self.0.len() {
            write!(f, "{prefix}…")
        } else {
            f.write_str(&prefix)
        }
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({self})")
    }
}

/// Chat identifier in the messaging channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
