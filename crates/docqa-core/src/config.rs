//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_PROVIDER__API_KEY`). Provides helpers
//! to expand `~` and `${VAR}` and to resolve relative paths against a known
//! base directory.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Like [`Config::load`], reading the TOML files from `base` instead of the
    /// working directory.
    pub fn load_from(base: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(base.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::NotFound(format!("'{key}': {e}")).into())
    }

    /// The typed application settings; missing sections fall back to defaults.
    pub fn app(&self) -> anyhow::Result<AppConfig> {
        let app: AppConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read application config: {}", e))?;
        app.validate()?;
        Ok(app)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        if matches!(env, "prod" | "production") {
            let key: Option<String> = self.figment.extract_inner("provider.api_key").ok();
            if key.as_deref().map_or(true, str::is_empty) && !fake_embeddings_enabled() {
                return Err(Error::InvalidConfig("provider.api_key is required in production".into()).into());
            }
        }
        Ok(())
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1` swaps the remote embedder for the offline hash embedder.
pub fn fake_embeddings_enabled() -> bool {
    env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub provider: ProviderConfig,
}

impl AppConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.chunking.max_chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.max_chunk_size must be > 0".into()));
        }
        if self.chunking.overlap >= self.chunking.max_chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunking.max_chunk_size ({})",
                self.chunking.overlap, self.chunking.max_chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub papers_dir: String,
    pub index_dir: String,
    pub summaries_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            papers_dir: "papers".to_string(),
            index_dir: "index".to_string(),
            summaries_file: "summaries.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub answer_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub temperature: f32,
    pub summary_pages: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 2, answer_max_tokens: 400, summary_max_tokens: 300, temperature: 0.0, summary_pages: 3 }
    }
}

/// Endpoint, credentials and retry policy handed to the provider constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub generation_model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            embedding_model: "text-embedding-ada-002".to_string(),
            generation_model: "gpt-3.5-turbo-instruct".to_string(),
            timeout_secs: 60,
            max_retries: 3,
            backoff_ms: 500,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
