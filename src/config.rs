use std::net::SocketAddr;

use anyhow::{Context, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://blog.db";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";
pub const DEFAULT_LOG_FILTER: &str = "blog_api=info,tower_http=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
}

impl Config {
    /// Reads `DATABASE_URL` and `BIND_ADDRESS`, falling back to defaults.
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("BIND_ADDRESS").ok(),
        )
    }

    fn from_vars(database_url: Option<String>, bind_address: Option<String>) -> Result<Self> {
        let database_url = database_url.unwrap_or_else(|| {
            tracing::warn!("DATABASE_URL not set, using {}", DEFAULT_DATABASE_URL);
            DEFAULT_DATABASE_URL.to_owned()
        });
        let bind_address = bind_address.unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned());
        let bind_address = bind_address
            .parse()
            .with_context(|| format!("Failed to parse bind address {bind_address}"))?;
        Ok(Config {
            database_url,
            bind_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_vars(None, None).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_address, "127.0.0.1:3001".parse().unwrap());
    }

    #[test]
    fn explicit_values_win() {
        let config = Config::from_vars(
            Some("sqlite:///tmp/other.db".into()),
            Some("0.0.0.0:8080".into()),
        )
        .unwrap();
        assert_eq!(config.database_url, "sqlite:///tmp/other.db");
        assert_eq!(config.bind_address.port(), 8080);
    }

    #[test]
    fn bad_bind_address_is_an_error() {
        let error = Config::from_vars(None, Some("localhost".into())).unwrap_err();
        assert!(error.to_string().contains("localhost"));
    }
}
