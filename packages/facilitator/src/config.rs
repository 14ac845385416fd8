use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::domains::agents::initializer::DEFAULT_MAX_CONCURRENT_INITIALIZATIONS;
use crate::kernel::stream_hub::DEFAULT_CHANNEL_CAPACITY;
use crate::kernel::GPT_4O;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    /// Upper bound on agents initialized at once during startup
    pub agent_init_concurrency: usize,
    /// Buffered broadcast events per thread channel
    pub broadcast_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| GPT_4O.to_string()),
            agent_init_concurrency: env::var("AGENT_INIT_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT_INITIALIZATIONS.to_string())
                .parse()
                .context("AGENT_INIT_CONCURRENCY must be a positive number")?,
            broadcast_capacity: env::var("BROADCAST_CAPACITY")
                .unwrap_or_else(|_| DEFAULT_CHANNEL_CAPACITY.to_string())
                .parse()
                .context("BROADCAST_CAPACITY must be a positive number")?,
        })
    }
}
