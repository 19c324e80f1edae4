//! Lookup-key derivation from a PIN and two letters.
//!
//! The digest is the lowercase hex SHA-256 of `"<pin>-<letters>"`. It is the
//! only thing a second device needs to find a stored record, so the format
//! must never change.

use crate::validation::{ValidationError, validate_letters, validate_pin};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        validate_pin(input.trim()).map(|pin| Self(pin.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Pin {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Two letters from `A`-`Z`, in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letters(String);

impl Letters {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        validate_letters(input).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Letters {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Letters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex digest used as the `pin_hash` column. Not unique across records.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyHash(String);

impl KeyHash {
    #[must_use]
    pub fn derive(pin: &Pin, letters: &Letters) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(pin.as_str().as_bytes());
        hasher.update(b"-");
        hasher.update(letters.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps a digest read back from storage.
    #[must_use]
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First ten characters, for logs.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.get(..10).unwrap_or(&self.0)
    }
}

impl fmt::Debug for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyHash({}...)", self.prefix())
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses and derives in one step, for callers holding raw input.
pub fn derive_key(pin: &str, letters: &str) -> Result<KeyHash, ValidationError> {
    let pin = Pin::parse(pin)?;
    let letters = Letters::parse(letters)?;
    Ok(KeyHash::derive(&pin, &letters))
}
