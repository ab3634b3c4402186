use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub url: String,
    /// Live catalog is only used when a key is present.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub poll_interval: Duration,
    pub event_probability: f64,
    pub swap_latency: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database: Option<DatabaseConfig>,
    pub gemini: GeminiConfig,
    pub market_data: MarketDataConfig,
    pub simulator: SimulatorConfig,
    pub http_timeout: Duration,
    pub session_dir: PathBuf,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(4_000),
            event_probability: 0.15,
            swap_latency: Duration::from_millis(1_500),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database: None,
            gemini: GeminiConfig {
                api_key: None,
                model: "gemini-3-flash-preview".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            },
            market_data: MarketDataConfig {
                url: "https://api.jup.ag/tokens/v2/recent".to_string(),
                api_key: None,
            },
            simulator: SimulatorConfig::default(),
            http_timeout: Duration::from_secs(10),
            session_dir: PathBuf::from("./.streambags"),
        }
    }
}

impl Config {
    /// Build from the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 5)?,
                acquire_timeout: Duration::from_secs(parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            }),
            None => None,
        };

        let event_probability: f64 = parse_or(
            &get,
            "TRADE_EVENT_PROBABILITY",
            defaults.simulator.event_probability,
        )?;
        if !(0.0..=1.0).contains(&event_probability) {
            anyhow::bail!("TRADE_EVENT_PROBABILITY must be within 0..=1, got {event_probability}");
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database,
            gemini: GeminiConfig {
                api_key: get("API_KEY"),
                model: get("GEMINI_MODEL").unwrap_or(defaults.gemini.model),
                base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini.base_url),
            },
            market_data: MarketDataConfig {
                url: get("MARKET_DATA_URL").unwrap_or(defaults.market_data.url),
                api_key: get("MARKET_DATA_API_KEY"),
            },
            simulator: SimulatorConfig {
                poll_interval: Duration::from_millis(parse_or(&get, "TRADE_POLL_INTERVAL_MS", 4_000)?),
                event_probability,
                swap_latency: Duration::from_millis(parse_or(&get, "SWAP_LATENCY_MS", 1_500)?),
            },
            http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 10)?),
            session_dir: get("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_dir),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
