//! Token catalog: a fixed demo set, or the live market-data endpoint mapped
//! into [`Token`]. Any failure degrades to an empty list.

use serde::Deserialize;

use crate::model::Token;

fn demo_token(
    id: &str,
    symbol: &str,
    name: &str,
    price: f64,
    change24h: f64,
    market_cap: f64,
    volume24h: f64,
) -> Token {
    Token {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: name.to_string(),
        image: format!("https://picsum.photos/seed/{}/200", symbol.to_lowercase()),
        price,
        change24h,
        market_cap,
        volume24h,
        fdv: 0.0,
        organic_score: 0.0,
        liquidity: 0.0,
        holder_count: 0,
        is_verified: false,
    }
}

pub fn demo_tokens() -> Vec<Token> {
    vec![
        demo_token("solana", "SOL", "Solana", 145.20, 3.5, 65_000_000_000.0, 2_100_000_000.0),
        demo_token("bonk", "BONK", "Bonk", 0.000021, -1.2, 1_200_000_000.0, 150_000_000.0),
        demo_token("jupiter", "JUP", "Jupiter", 1.12, 12.4, 1_500_000_000.0, 300_000_000.0),
        demo_token("pyth", "PYTH", "Pyth Network", 0.45, 0.8, 600_000_000.0, 50_000_000.0),
        demo_token("raydium", "RAY", "Raydium", 1.85, -5.1, 450_000_000.0, 20_000_000.0),
    ]
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketToken {
    pub id: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub icon: Option<String>,
    pub usd_price: Option<f64>,
    pub mcap: Option<f64>,
    pub fdv: Option<f64>,
    pub liquidity: Option<f64>,
    pub holder_count: Option<u64>,
    pub organic_score: Option<f64>,
    pub is_verified: Option<bool>,
    pub stats24h: Option<MarketStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketStats {
    pub price_change: Option<f64>,
    pub buy_volume: Option<f64>,
    pub sell_volume: Option<f64>,
}

/// Map one market-data entry. Entries without an id are dropped; every other
/// absent field falls back to 0 / "" / false.
pub fn map_market_token(raw: MarketToken) -> Option<Token> {
    let id = raw.id.filter(|id| !id.trim().is_empty())?;
    let stats = raw.stats24h.unwrap_or_default();

    Some(Token {
        id,
        symbol: raw.symbol.unwrap_or_default(),
        name: raw.name.unwrap_or_default(),
        image: raw.icon.unwrap_or_default(),
        price: finite_or_zero(raw.usd_price),
        change24h: finite_or_zero(stats.price_change),
        market_cap: finite_or_zero(raw.mcap),
        volume24h: finite_or_zero(stats.buy_volume) + finite_or_zero(stats.sell_volume),
        fdv: finite_or_zero(raw.fdv),
        organic_score: finite_or_zero(raw.organic_score).clamp(0.0, 100.0),
        liquidity: finite_or_zero(raw.liquidity),
        holder_count: raw.holder_count.unwrap_or(0),
        is_verified: raw.is_verified.unwrap_or(false),
    })
}

fn finite_or_zero(v: Option<f64>) -> f64 {
    v.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Parse a raw response body; anything that is not a JSON array is empty.
pub fn parse_market_response(body: &[u8]) -> Vec<Token> {
    let entries: Vec<serde_json::Value> = match serde_json::from_slice(body) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "market data response is not a token array");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<MarketToken>(entry).ok())
        .filter_map(map_market_token)
        .collect()
}

#[derive(Clone)]
pub enum TokenCatalog {
    Demo,
    Live {
        client: reqwest::Client,
        url: String,
        api_key: String,
    },
}

impl TokenCatalog {
    pub fn live(client: reqwest::Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        TokenCatalog::Live {
            client,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn fetch(&self) -> Vec<Token> {
        match self {
            TokenCatalog::Demo => demo_tokens(),
            TokenCatalog::Live {
                client,
                url,
                api_key,
            } => fetch_live(client, url, api_key).await,
        }
    }
}

async fn fetch_live(client: &reqwest::Client, url: &str, api_key: &str) -> Vec<Token> {
    let response = match client.get(url).header("x-api-key", api_key).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, url, "market data request failed");
            return Vec::new();
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%status, url, "market data endpoint returned an error");
        return Vec::new();
    }

    match response.bytes().await {
        Ok(body) => parse_market_response(&body),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read market data body");
            Vec::new()
        }
    }
}

/// `$1.23K`-style compaction used by the terminal table.
pub fn format_usd(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${value:.2}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganicTier {
    High,
    Medium,
    Low,
    Poor,
}

/// `None` when the source gave no score.
pub fn organic_tier(score: f64) -> Option<OrganicTier> {
    if score <= 0.0 || !score.is_finite() {
        return None;
    }
    Some(if score >= 80.0 {
        OrganicTier::High
    } else if score >= 60.0 {
        OrganicTier::Medium
    } else if score >= 40.0 {
        OrganicTier::Low
    } else {
        OrganicTier::Poor
    })
}
