//! Server configuration loaded from environment variables.

use std::path::PathBuf;

/// Runtime settings for the HTTP server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind (from NOTEKEEPER_HOST)
    pub host: String,
    /// Port to bind (from NOTEKEEPER_PORT)
    pub port: u16,
    /// SQLite file; `None` means the platform data directory (from NOTEKEEPER_DATABASE)
    pub database: Option<PathBuf>,
    /// Allowed CORS origins (from NOTEKEEPER_CORS_ORIGINS, comma-separated)
    pub cors_origins: Option<Vec<String>>,
    /// Mark the session cookie `Secure` (from NOTEKEEPER_SECURE_COOKIES)
    pub secure_cookies: bool,
}

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8000;

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("NOTEKEEPER_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());

        let port = lookup("NOTEKEEPER_PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(Self::DEFAULT_PORT);

        let database = lookup("NOTEKEEPER_DATABASE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let cors_origins = lookup("NOTEKEEPER_CORS_ORIGINS").map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let secure_cookies = lookup("NOTEKEEPER_SECURE_COOKIES")
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            host,
            port,
            database,
            cors_origins,
            secure_cookies,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            database: None,
            cors_origins: None,
            secure_cookies: false,
        }
    }
}
