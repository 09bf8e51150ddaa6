//! Startup shared by the `docqa-index` and `docqa-ask` binaries.

use std::env;
use std::path::PathBuf;

use docqa_core::config::{resolve_with_base, AppConfig, Config};
use tracing_subscriber::EnvFilter;

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();
}

/// Typed settings plus the directory relative paths are resolved against.
pub struct Settings {
    pub app: AppConfig,
    pub base_dir: PathBuf,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let config = Config::load().map_err(|e| {
            eprintln!("Error loading config: {}", e);
            e
        })?;
        let app = config.app()?;
        let base_dir = env::current_dir()?;
        Ok(Self { app, base_dir })
    }

    pub fn papers_dir(&self) -> PathBuf { resolve_with_base(&self.base_dir, &self.app.data.papers_dir) }

    pub fn index_dir(&self) -> PathBuf { resolve_with_base(&self.base_dir, &self.app.data.index_dir) }

    pub fn summaries_file(&self) -> PathBuf { resolve_with_base(&self.base_dir, &self.app.data.summaries_file) }
}
