use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use std::sync::Arc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower_http::cors::CorsLayer;

use crate::advisor::{AdviceRequest, AnalyzeRequest, GeminiClient, TextResponse};
use crate::catalog::TokenCatalog;
use crate::config::Config;
use crate::error::{ApiError, ApiJson};
use crate::model::{FeeData, NewProfile, StreamerProfile, SwapReceipt, SwapRequest, Token};
use crate::registry::{postgres, PgStore, ProfileRegistry};
use crate::session::{SessionCache, SessionId, SESSION_HEADER};
use crate::simulator::{self, SwapSimulator, TradeFeed};

pub struct AppState {
    pub registry: ProfileRegistry,
    pub catalog: TokenCatalog,
    pub gemini: GeminiClient,
    pub trade_feed: TradeFeed,
    pub swaps: SwapSimulator,
    pub session: SessionCache,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let registry = match &config.database {
            Some(db) => {
                let pool = postgres::get_db_pool(db).await?;
                tracing::info!("registry backed by Postgres");
                ProfileRegistry::new(Arc::new(PgStore::new(pool)))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, registry is in-memory");
                ProfileRegistry::in_memory()
            }
        };

        let catalog = match &config.market_data.api_key {
            Some(key) => TokenCatalog::live(http.clone(), &config.market_data.url, key),
            None => {
                tracing::info!("MARKET_DATA_API_KEY not set, serving demo tokens");
                TokenCatalog::Demo
            }
        };

        if config.gemini.api_key.is_none() {
            tracing::warn!("API_KEY not set, advisory endpoints will answer 500");
        }

        Ok(Self {
            registry,
            catalog,
            gemini: GeminiClient::new(http, config.gemini.clone()),
            trade_feed: TradeFeed::from_config(&config.simulator),
            swaps: SwapSimulator::new(config.simulator.swap_latency),
            session: SessionCache::new(&config.session_dir),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/analyze", post(analyze))
        .route("/api/advice", post(advice))
        .route("/api/streamers", get(list_streamers).post(create_streamer))
        .route("/api/streamers/:slug", get(streamer_by_slug))
        .route("/api/streamers/by-wallet/:wallet", get(streamer_by_wallet))
        .route("/api/session", get(session_profile))
        .route("/api/tokens", get(tokens))
        .route("/api/fees/:partner_key", get(fees))
        .route("/api/swap", post(swap))
        .route("/api/events/:partner_key", get(trade_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    match state.gemini.analyze_token(&req.token).await {
        Ok(text) => Ok(Json(TextResponse { text })),
        Err(e) => {
            tracing::error!(error = %e, symbol = %req.token.symbol, "analyze failed");
            Err(ApiError::internal("Failed to analyze token"))
        }
    }
}

async fn advice(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AdviceRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    match state
        .gemini
        .trading_advice(&req.query, &req.available_tokens)
        .await
    {
        Ok(text) => Ok(Json(TextResponse { text })),
        Err(e) => {
            tracing::error!(error = %e, "Advice Error");
            Err(ApiError::internal("Failed to get advice"))
        }
    }
}

async fn list_streamers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StreamerProfile>>, ApiError> {
    Ok(Json(state.registry.get_all().await?))
}

fn session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(SessionId::parse)
}

/// Registers the profile and caches it under the caller's session, issuing a
/// new session id when the request carries none.
async fn create_streamer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<NewProfile>,
) -> Result<(StatusCode, [(&'static str, String); 1], Json<StreamerProfile>), ApiError> {
    let profile = state.registry.create(req).await?;
    let session = session_id(&headers).unwrap_or_else(SessionId::generate);
    state.session.save(&session, &profile).await;
    Ok((
        StatusCode::CREATED,
        [(SESSION_HEADER, session.to_string())],
        Json(profile),
    ))
}

async fn streamer_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<StreamerProfile>, ApiError> {
    state
        .registry
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("terminal not found"))
}

async fn streamer_by_wallet(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
) -> Result<Json<StreamerProfile>, ApiError> {
    state
        .registry
        .get_by_wallet(&wallet)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no terminal for this wallet"))
}

async fn session_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StreamerProfile>, ApiError> {
    let session = session_id(&headers).ok_or_else(|| ApiError::not_found("no saved profile"))?;
    state
        .session
        .load(&session)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no saved profile"))
}

async fn tokens(State(state): State<Arc<AppState>>) -> Json<Vec<Token>> {
    Json(state.catalog.fetch().await)
}

async fn fees(Path(partner_key): Path<String>) -> Json<FeeData> {
    Json(simulator::fetch_fee_data(&partner_key))
}

async fn swap(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SwapRequest>,
) -> Result<Json<SwapReceipt>, ApiError> {
    Ok(Json(state.swaps.execute(req).await?))
}

/// SSE feed for the stream overlay. The subscription lives inside the
/// response stream, so a disconnecting client stops its feed.
async fn trade_events(
    State(state): State<Arc<AppState>>,
    Path(partner_key): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (subscription, rx) = state.trade_feed.subscribe_channel(&partner_key);
    tracing::info!(partner_key = %partner_key, "overlay subscribed");

    let stream = ReceiverStream::new(rx).map(move |event| {
        let _feed = &subscription;
        Event::default().event("trade").json_data(&event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
