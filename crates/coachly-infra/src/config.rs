//! Global configuration loader for Coachly.
//!
//! Reads `config.toml` from the data directory (`~/.coachly/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed. Vendor API keys come from the environment.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use coachly_types::config::GlobalConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "COACHLY_DATA_DIR";
pub const ANTHROPIC_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const TAVUS_KEY_ENV: &str = "TAVUS_API_KEY";

/// Resolve the data directory.
///
/// Priority:
/// 1. `COACHLY_DATA_DIR` environment variable
/// 2. `~/.coachly`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".coachly");
    }

    PathBuf::from(".coachly")
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`GlobalConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Vendor credentials. Either may be absent; the features that need a
/// missing key report it as not configured.
#[derive(Default)]
pub struct ApiKeys {
    pub anthropic: Option<SecretString>,
    pub tavus: Option<SecretString>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var(ANTHROPIC_KEY_ENV).ok(),
            std::env::var(TAVUS_KEY_ENV).ok(),
        )
    }

    /// Blank values count as unset.
    pub fn from_values(anthropic: Option<String>, tavus: Option<String>) -> Self {
        fn secret(value: Option<String>) -> Option<SecretString> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
        }

        Self {
            anthropic: secret(anthropic),
            tavus: secret(tavus),
        }
    }
}
