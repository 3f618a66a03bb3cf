use std::num::NonZeroU32;
use std::str::FromStr;
use std::{env, fs};

use anyhow::{Context, Result};
use company_intel::IntelConfig;
use dotenvy::dotenv;
use secrecy::SecretString;

/// Application configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: SecretString,
    pub openai_model: String,
    pub openai_embedding_model: String,
    pub openai_base_url: Option<String>,
    pub openai_requests_per_second: Option<NonZeroU32>,
    pub database_url: Option<String>,
    pub intel: IntelConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Unset and empty variables are treated
    /// the same.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut intel = match var("INTEL_CONFIG") {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read INTEL_CONFIG file {}", path))?;
                IntelConfig::from_json(&json).context("INTEL_CONFIG is not a valid config")?
            }
            None => IntelConfig::default(),
        };

        if let Some(tokens) = parse(&var, "INTEL_MAP_CHUNK_TOKENS")? {
            intel = intel.with_map_chunk_tokens(tokens);
        }
        if let Some(tokens) = parse(&var, "INTEL_STORAGE_CHUNK_TOKENS")? {
            intel = intel.with_storage_chunk_tokens(tokens);
        }
        if let Some(tokens) = parse(&var, "INTEL_REDUCE_TOKEN_BUDGET")? {
            intel = intel.with_reduce_token_budget(tokens);
        }
        if let Some(secs) = parse(&var, "INTEL_COMPLETION_TIMEOUT_SECS")? {
            intel = intel.with_completion_timeout_secs(secs);
        }
        if let Some(k) = parse(&var, "INTEL_RETRIEVAL_K")? {
            intel = intel.with_retrieval_k(k);
        }
        if let Some(replace) = parse(&var, "INTEL_REPLACE_COLLECTION_ON_INGEST")? {
            intel = intel.with_replace_collection_on_ingest(replace);
        }
        intel.validate().context("Invalid INTEL_* settings")?;

        Ok(Self {
            port: parse(&var, "PORT")?.unwrap_or(5000),
            openai_api_key: var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?
                .into(),
            openai_model: var("OPENAI_MODEL")
                .unwrap_or_else(|| company_intel::ai::DEFAULT_MODEL.to_string()),
            openai_embedding_model: var("OPENAI_EMBEDDING_MODEL").unwrap_or_else(|| {
                company_intel::ai::DEFAULT_EMBEDDING_MODEL.to_string()
            }),
            openai_base_url: var("OPENAI_BASE_URL"),
            openai_requests_per_second: parse(&var, "OPENAI_REQUESTS_PER_SECOND")?,
            database_url: var("DATABASE_URL"),
            intel,
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("{} must be a valid value, got '{}'", name, raw))
        })
        .transpose()
}
