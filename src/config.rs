use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the Redis substrate, if one is configured.
    /// When absent the server falls back to the in-memory substrate.
    pub redis_url: Option<String>,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            redis_url: env::var("REDIS_URL").ok(),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
        })
    }
}
