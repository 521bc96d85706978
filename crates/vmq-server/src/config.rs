//! Query server configuration.

use serde::Deserialize;

/// Listen settings for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Listen address (e.g., "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl ApiConfig {
    /// Load config from environment variables (`VMQ_HOST`, `VMQ_PORT`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, over any key lookup. An unparseable port keeps the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("VMQ_HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host;
        }
        if let Some(raw) = lookup("VMQ_PORT") {
            match raw.trim().parse() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid VMQ_PORT"),
            }
        }
        config
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
