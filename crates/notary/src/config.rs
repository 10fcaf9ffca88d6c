//! Notary configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [session]
//! require_confirmed = true
//!
//! [anchor]
//! ledger_timeout_ms = 30000
//! store_timeout_ms = 10000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NotaryError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaryConfig {
    /// Session authentication settings.
    pub session: SessionConfig,
    /// Notarization anchoring settings.
    pub anchor: AnchorConfig,
}

impl NotaryConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| NotaryError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| NotaryError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| NotaryError::Config(e.to_string()))
    }
}

/// Configuration for the session authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Authenticated operations require a confirmed account.
    pub require_confirmed: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            require_confirmed: true,
        }
    }
}

/// Configuration for the notarization anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Upper bound on a single ledger submission.
    #[serde(rename = "ledger_timeout_ms", with = "duration_ms")]
    pub ledger_timeout: Duration,

    /// Upper bound on each notarization-store call.
    #[serde(rename = "store_timeout_ms", with = "duration_ms")]
    pub store_timeout: Duration,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            ledger_timeout: Duration::from_secs(30),
            store_timeout: Duration::from_secs(10),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
