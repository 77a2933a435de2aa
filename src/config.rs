use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redis connection URL; when unset the bounded in-memory cache is used
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TTL for cached recommendation results, in seconds
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,

    /// Entry cap for the in-memory result cache
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Share of each result page drawn from the low-scoring pool
    #[serde(default = "default_diversity_ratio")]
    pub diversity_ratio: f64,

    /// Fill empty pages with sample placeholders (empty-catalog deployments)
    #[serde(default)]
    pub pad_empty_results: bool,

    /// JSON fixture file seeding the in-memory catalog store
    #[serde(default)]
    pub catalog_path: Option<String>,

    /// JSON fixture file seeding the in-memory watch-history store
    #[serde(default)]
    pub history_path: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    1024
}

fn default_diversity_ratio() -> f64 {
    0.2
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
