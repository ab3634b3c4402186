use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// A registered streamer terminal, keyed publicly by `slug`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamerProfile {
    pub id: String,
    pub slug: String,
    pub display_name: String,
    pub wallet_address: String,
    pub partner_key: String,
}

/// Registration request as submitted from the dashboard.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub wallet_address: String,
    pub slug: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub change24h: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub volume24h: f64,
    #[serde(default)]
    pub fdv: f64,
    #[serde(default)]
    pub organic_score: f64, // 0-100
    #[serde(default)]
    pub liquidity: f64,
    #[serde(default)]
    pub holder_count: u64,
    #[serde(default)]
    pub is_verified: bool,
}

/// Synthetic trade notification shown on the stream overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    pub id: String,
    pub token_symbol: String,
    pub amount_usd: u32,
    pub timestamp: i64, // unix millis
    pub user_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeData {
    pub unclaimed: f64,
    pub lifetime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub partner_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    pub id: String,
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub partner_key: String,
    pub executed_at: DateTime<Utc>,
}
