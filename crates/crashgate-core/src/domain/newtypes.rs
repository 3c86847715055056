//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for event ids and the per-install identifier.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// EventId
// ============================================================================

/// Unique identifier of a single diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new random EventId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight hex characters, used in report file names
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid EventId: {e}")))
    }
}

// ============================================================================
// InstallId
// ============================================================================

/// Anonymous per-installation identifier.
///
/// Always [`InstallId::BYTE_LEN`] random bytes, hex-encoded to
/// [`InstallId::HEX_LEN`] lowercase characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstallId(String);

impl InstallId {
    pub const BYTE_LEN: usize = 20;
    pub const HEX_LEN: usize = Self::BYTE_LEN * 2;

    /// Build an identifier from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; Self::BYTE_LEN]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse a stored identifier, accepting upper- or lowercase hex.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let value = value.trim();
        if value.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidInstallId(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                value.len()
            )));
        }
        hex::decode(value).map_err(|e| DomainError::InvalidInstallId(e.to_string()))?;
        Ok(Self(value.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InstallId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstallId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InstallId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InstallId> for String {
    fn from(id: InstallId) -> Self {
        id.0
    }
}
