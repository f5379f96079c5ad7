use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// OMDb API key
    pub omdb_api_key: String,

    /// OMDb API base URL
    #[serde(default = "default_omdb_api_url", alias = "omdb_api_base_url")]
    pub omdb_api_url: String,

    /// Location of the favorites JSON file
    #[serde(default = "default_favorites_path")]
    pub favorites_path: PathBuf,

    /// Page size used when listing favorites
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma separated list of allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_omdb_api_url() -> String {
    "http://www.omdbapi.com/".to_string()
}

fn default_favorites_path() -> PathBuf {
    PathBuf::from("data").join("favorites.json")
}

fn default_page_size() -> u32 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_cors_origins() -> String {
    "http://localhost:3000".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if config.default_page_size == 0 {
            anyhow::bail!("DEFAULT_PAGE_SIZE must be a positive integer");
        }

        Ok(config)
    }

    /// Allowed CORS origins, trimmed, empty entries dropped
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
