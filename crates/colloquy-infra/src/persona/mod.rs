//! Persona catalog: built-ins merged with `{data_dir}/personas.toml`.
//!
//! ```toml
//! [[persona]]
//! name = "grace"
//! display_name = "Grace"
//! emoji = "⚓"
//! label_color = "blue"
//! system_prompt = "You are Grace Hopper..."
//! ```
//!
//! User entries override built-ins with the same case-insensitive name.

pub mod builtin;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use colloquy_core::chat::persona::StaticPersonaProvider;
use colloquy_types::persona::Persona;

use self::builtin::builtin_personas;

pub const PERSONAS_FILE: &str = "personas.toml";

#[derive(Debug, Error)]
pub enum PersonaCatalogError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid persona in {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Default, Deserialize)]
struct PersonaFile {
    #[serde(default, rename = "persona")]
    personas: Vec<Persona>,
}

/// Load the persona catalog for `data_dir`.
///
/// A missing `personas.toml` just means built-ins only. A file that exists
/// but cannot be read or parsed is an error, so typos are not silently ignored.
pub async fn load_personas(data_dir: &Path) -> Result<StaticPersonaProvider, PersonaCatalogError> {
    let mut provider = StaticPersonaProvider::new(builtin_personas());
    let path = data_dir.join(PERSONAS_FILE);

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {} found, using built-in personas", path.display());
            return Ok(provider);
        }
        Err(source) => return Err(PersonaCatalogError::Io { path, source }),
    };

    let file: PersonaFile = toml::from_str(&content).map_err(|source| PersonaCatalogError::Parse {
        path: path.clone(),
        source,
    })?;

    for persona in file.personas {
        if Persona::canonical_name(&persona.name).is_empty() {
            return Err(PersonaCatalogError::Invalid {
                path,
                reason: "persona name must not be empty".to_string(),
            });
        }
        tracing::debug!(persona = %persona.name, "loaded user persona");
        provider.insert(persona);
    }

    Ok(provider)
}
