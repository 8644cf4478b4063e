use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use parley_persist::Tier;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub chat: ChatConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
    pub media: MediaConfig,

    /// Backing model for the image-generation tool. Absent means the tool is
    /// never attached.
    #[serde(default)]
    pub image_model: Option<EngineModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL, prefixed to generated media paths.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Sliding window keeps up to 2x this many history messages.
    pub conversation_length: usize,
    /// Attachment budget across the window, newest first.
    pub max_attachments: usize,
    /// Floor between chunk writes, to keep buffering proxies happy.
    pub stream_min_delay_ms: u64,
    /// Bounded wait for the next provider stream event.
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineModel {
    pub engine: String,
    pub model: String,
}

/// Per-tier caps. Zero means uncapped.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TierLimits {
    pub rpm: u64,
    pub tokens_24h: u64,
    pub images_month: u64,
}

const UNLIMITED: TierLimits = TierLimits {
    rpm: 0,
    tokens_24h: 0,
    images_month: 0,
};

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub free: TierLimits,
    pub basic: TierLimits,
    pub pro: TierLimits,
}

impl LimitsConfig {
    pub fn for_tier(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Free => self.free,
            Tier::Basic => self.basic,
            Tier::Pro => self.pro,
            Tier::Unlimited => UNLIMITED,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory generated images are written to.
    pub dir: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_, CHAT_, LOG_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::default()
                    .prefix("SERVER")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("CHAT")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("LOG")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }

    /// Provider credential for an engine, from the `<ENGINE>_API_KEY`
    /// environment variable. Secrets never live in TOML.
    pub fn api_key_for(&self, engine_id: &str) -> Option<String> {
        std::env::var(format!("{}_API_KEY", engine_id.to_uppercase())).ok()
    }

    /// Credential for the web search tool.
    pub fn search_api_key(&self) -> Option<String> {
        std::env::var("TAVILY_API_KEY").ok()
    }
}
