use anyhow::Context as _;
use feed_client::{FeedApi, Session};
use feed_core::config::{default_config_path, Config, CONFIG_DIR, CONFIG_FILE};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Resolve the config file location.
///
/// Priority:
/// 1. `--config` flag / `FEED_CONFIG` env var (passed in as `explicit`)
/// 2. `~/.catalog-feed/config.yaml`
/// 3. `.catalog-feed/config.yaml` under the current directory
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    default_config_path().unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE))
}

/// Loaded configuration with command line overrides applied.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
}

impl Context {
    pub fn load(
        explicit: Option<&Path>,
        server: Option<String>,
        user: Option<String>,
    ) -> anyhow::Result<Self> {
        let config_path = resolve_config_path(explicit);
        let mut config = Config::load(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?;
        if let Some(url) = server {
            config.api.base_url = url;
        }
        if let Some(user) = user {
            config.api.user = user;
        }
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn api(&self) -> anyhow::Result<FeedApi> {
        FeedApi::from_config(&self.config.api).context("failed to build API client")
    }

    pub fn session(&self) -> Session {
        Session::from_config(&self.config)
    }
}

/// Run one async command to completion on a fresh runtime.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    Ok(rt.block_on(fut))
}
