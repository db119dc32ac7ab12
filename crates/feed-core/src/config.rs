use crate::error::Result;
use crate::feed::DEFAULT_INLINE_REPLIES;
use crate::filter::DEFAULT_RANGE_DAYS;
use crate::reaction::ReactionType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".catalog-feed";
pub const CONFIG_FILE: &str = "config.yaml";

/// `~/.catalog-feed/config.yaml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(CONFIG_DIR).join(CONFIG_FILE))
}

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Principal sent with every request.
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8585".to_string()
}

fn default_user() -> String {
    "admin".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user: default_user(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_inline_replies")]
    pub inline_replies: usize,
    #[serde(default = "default_reactions")]
    pub reactions: Vec<ReactionType>,
}

fn default_inline_replies() -> usize {
    DEFAULT_INLINE_REPLIES
}

fn default_reactions() -> Vec<ReactionType> {
    ReactionType::all().to_vec()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            inline_replies: default_inline_replies(),
            reactions: default_reactions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_range_days")]
    pub default_range_days: u32,
}

fn default_page_size() -> usize {
    15
}

fn default_range_days() -> u32 {
    DEFAULT_RANGE_DAYS
}

impl Default for IncidentConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_range_days: default_range_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// YAML file with the initial entities, threads, incidents and policies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,
}

fn default_port() -> u16 {
    8585
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub incidents: IncidentConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message })
        };

        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://")) {
            push(
                WarnLevel::Error,
                format!("api.base_url '{}' is not an http(s) URL", self.api.base_url),
            );
        }
        if self.api.user.trim().is_empty() {
            push(WarnLevel::Error, "api.user is empty".to_string());
        }
        if self.api.timeout_secs == 0 {
            push(
                WarnLevel::Warning,
                "api.timeout_secs is 0, requests will never time out".to_string(),
            );
        }
        if self.feed.inline_replies == 0 {
            push(
                WarnLevel::Warning,
                "feed.inline_replies is 0, replies are only shown on demand".to_string(),
            );
        }
        if self.feed.reactions.is_empty() {
            push(WarnLevel::Warning, "feed.reactions is empty".to_string());
        }
        for (i, r) in self.feed.reactions.iter().enumerate() {
            if self.feed.reactions[..i].contains(r) {
                push(
                    WarnLevel::Warning,
                    format!("feed.reactions lists '{r}' more than once"),
                );
            }
        }
        if self.incidents.page_size == 0 {
            push(WarnLevel::Error, "incidents.page_size must be at least 1".to_string());
        }
        if self.incidents.default_range_days == 0 {
            push(
                WarnLevel::Warning,
                "incidents.default_range_days is 0, the default range is empty".to_string(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
