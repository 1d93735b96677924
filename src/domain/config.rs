use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for a library data directory.
///
/// Loan period, books per borrow and the daily fine are fixed; this holds
/// the settings a library may reasonably differ on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Whether books and members may be deleted while copies are out on loan
    /// to or from them.
    ///
    /// When `false` (default), such deletions are refused.
    pub allow_deleting_referenced: bool,

    /// Currency name used when printing fines.
    currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_deleting_referenced: false,
            currency: default_currency(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads the configuration, falling back to the defaults if the file is
    /// missing or invalid.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::debug!("Using default config: {e}");
            Self::default()
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The currency fines are quoted in.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Sets the currency fines are quoted in.
    pub fn set_currency(&mut self, currency: impl Into<String>) {
        self.currency = currency.into();
    }
}

fn default_currency() -> String {
    "baht".to_string()
}

/// The serialized versions of the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        allow_deleting_referenced: bool,

        #[serde(default = "default_currency")]
        currency: String,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                allow_deleting_referenced,
                currency,
            } => Self {
                allow_deleting_referenced,
                currency,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            allow_deleting_referenced: config.allow_deleting_referenced,
            currency: config.currency,
        }
    }
}
