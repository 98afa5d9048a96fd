use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// Absent key leaves the AI service uninitialized: generation calls fail
    /// fast instead of silently no-opping.
    pub gemini_api_key: Option<String>,
    pub requests_per_minute: u32,
    pub min_request_interval_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_sweep_interval_secs: u64,
    pub max_questions: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8080"),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            requests_per_minute: get_env_parse_or("REQUESTS_PER_MINUTE", 10)?,
            min_request_interval_ms: get_env_parse_or("MIN_REQUEST_INTERVAL_MS", 2000)?,
            cache_ttl_secs: get_env_parse_or("CACHE_TTL_SECS", 86_400)?,
            cache_sweep_interval_secs: get_env_parse_or("CACHE_SWEEP_INTERVAL_SECS", 3_600)?,
            max_questions: get_env_parse_or("MAX_QUESTIONS", 20)?,
        })
    }
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
