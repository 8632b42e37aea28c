use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::kernel::DEFAULT_BIAS_MODEL;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// When unset the server runs on the in-memory job store.
    pub database_url: Option<String>,
    pub groq_api_key: String,
    /// Override for proxies and compatible gateways.
    pub groq_base_url: Option<String>,
    pub bias_model: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            database_url: env::var("DATABASE_URL").ok(),
            groq_api_key: env::var("GROQ_API_KEY").context("GROQ_API_KEY must be set")?,
            groq_base_url: env::var("GROQ_BASE_URL").ok(),
            bias_model: env::var("BIAS_MODEL").unwrap_or_else(|_| DEFAULT_BIAS_MODEL.to_string()),
        })
    }
}
