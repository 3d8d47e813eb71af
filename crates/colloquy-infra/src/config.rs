//! Global configuration loader for Colloquy.
//!
//! Reads `config.toml` from the data directory (`~/.colloquy/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use colloquy_types::config::GlobalConfig;

/// Environment variable that relocates the data directory.
pub const DATA_DIR_ENV: &str = "COLLOQUY_DATA_DIR";

/// Environment variable naming the inference server, as Ollama itself reads it.
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

/// Resolve the data directory: `$COLLOQUY_DATA_DIR`, else `~/.colloquy`.
///
/// Falls back to `./.colloquy` when no home directory can be determined.
pub fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".colloquy")
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
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

/// Apply overrides on top of file configuration.
///
/// Priority, highest first: explicit `host`/`model` arguments (CLI flags),
/// `$OLLAMA_HOST`, then whatever `config.toml` said.
pub fn apply_overrides(
    mut config: GlobalConfig,
    ollama_host: Option<&str>,
    host: Option<&str>,
    model: Option<&str>,
) -> GlobalConfig {
    let chosen = host
        .into_iter()
        .chain(ollama_host)
        .map(str::trim)
        .find(|h| !h.is_empty());
    if let Some(url) = chosen {
        config.backend.base_url = normalize_base_url(url);
    }
    if let Some(model) = model.map(str::trim).filter(|m| !m.is_empty()) {
        config.backend.model = model.to_string();
    }
    config
}

/// Accept `host:port` as well as full URLs.
pub fn normalize_base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
