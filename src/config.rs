//! Configuration module for StreamPulse.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "streampulse.db")
    pub db_path: String,
    /// Base URL of the streaming engine (default: "http://127.0.0.1:6878")
    pub engine_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "streampulse.db".to_string(),
            engine_url: "http://127.0.0.1:6878".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STREAMPULSE_HTTP_PORT`: HTTP port (default: 8080)
    /// - `STREAMPULSE_DB_PATH`: Database file path (default: "streampulse.db")
    /// - `STREAMPULSE_ENGINE_URL`: Streaming engine base URL
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("STREAMPULSE_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(db_path) = env::var("STREAMPULSE_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Ok(engine_url) = env::var("STREAMPULSE_ENGINE_URL") {
            cfg.engine_url = engine_url;
        }

        cfg.engine_url = normalize_engine_url(&cfg.engine_url);
        cfg
    }
}

/// Normalize an engine base URL: ensure a scheme, drop any trailing slash.
pub fn normalize_engine_url(url: &str) -> String {
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    };
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.db_path, "streampulse.db");
        assert_eq!(cfg.engine_url, "http://127.0.0.1:6878");
    }

    #[test]
    fn test_normalize_engine_url() {
        assert_eq!(normalize_engine_url("127.0.0.1:6878"), "http://127.0.0.1:6878");
        assert_eq!(normalize_engine_url("http://engine:6878/"), "http://engine:6878");
        assert_eq!(normalize_engine_url("https://engine/"), "https://engine");
        assert_eq!(normalize_engine_url("http://engine"), "http://engine");
    }
}
