//! Application state shared by the CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use colloquy_core::chat::persona::{PersonaProvider, StaticPersonaProvider};
use colloquy_infra::config::{
    OLLAMA_HOST_ENV, apply_overrides, load_global_config, resolve_data_dir,
};
use colloquy_infra::persona::load_personas;
use colloquy_types::config::GlobalConfig;

/// Resolved configuration and persona catalog for one process run.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: GlobalConfig,
    pub personas: Arc<StaticPersonaProvider>,
}

impl AppState {
    /// Load config and personas, applying `--host`/`--model` and `$OLLAMA_HOST`.
    pub async fn init(host: Option<&str>, model: Option<&str>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        let config = load_global_config(&data_dir).await;
        let env_host = std::env::var(OLLAMA_HOST_ENV).ok();
        let config = apply_overrides(config, env_host.as_deref(), host, model);

        let personas = load_personas(&data_dir)
            .await
            .context("failed to load persona catalog")?;

        tracing::debug!(
            data_dir = %data_dir.display(),
            base_url = %config.backend.base_url,
            model = %config.backend.model,
            personas = personas.len(),
            "application state ready"
        );

        Ok(Self {
            data_dir,
            config,
            personas: Arc::new(personas),
        })
    }

    pub fn persona_provider(&self) -> Arc<dyn PersonaProvider> {
        self.personas.clone()
    }
}
