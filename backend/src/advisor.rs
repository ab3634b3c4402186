//! AI advisory proxy. [`GeminiClient`] is the server half that talks to the
//! model; [`AdvisorClient`] is what the terminal uses to call the proxy, and
//! it never returns an error.

use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::AdvisorError;
use crate::model::Token;

pub const ANALYSIS_FALLBACK: &str = "Analysis unavailable.";
pub const ADVICE_FALLBACK: &str = "Trading advice unavailable at the moment.";
pub const EMPTY_ANSWER: &str = "Analysis incomplete.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GenerationConfig {
    pub const ANALYSIS: GenerationConfig = GenerationConfig {
        temperature: 0.7,
        top_k: Some(40),
        top_p: Some(0.95),
    };

    pub const ADVICE: GenerationConfig = GenerationConfig {
        temperature: 0.8,
        top_k: None,
        top_p: None,
    };
}

pub fn analysis_prompt(token: &Token) -> String {
    format!(
        "Analyze this crypto token data for a live-stream trading audience. \
         Give a short sentiment read and the key risk in plain language.\n\
         Symbol: {}\n\
         Price: ${}\n\
         24h Change: {}%\n\
         Market Cap: ${}",
        token.symbol, token.price, token.change24h, token.market_cap
    )
}

pub fn advice_prompt(query: &str, tokens: &[Token]) -> String {
    let token_list = tokens
        .iter()
        .map(|t| format!("{} (${})", t.symbol, t.price))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "The user asks: \"{query}\".\n\
         The current available tokens are: {token_list}.\n\
         Act as a high-frequency trading analyst assistant for the Solana ecosystem. \
         Recommend tokens if they match the query, or explain general market conditions."
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CandidateContent {
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, concatenated.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        generation_config: GenerationConfig,
    ) -> Result<String, AdvisorError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AdvisorError::MissingApiKey)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config,
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Status { status, body });
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed.text().ok_or(AdvisorError::EmptyResponse)
    }

    pub async fn analyze_token(&self, token: &Token) -> Result<String, AdvisorError> {
        self.generate(&analysis_prompt(token), GenerationConfig::ANALYSIS)
            .await
    }

    pub async fn trading_advice(
        &self,
        query: &str,
        tokens: &[Token],
    ) -> Result<String, AdvisorError> {
        self.generate(&advice_prompt(query, tokens), GenerationConfig::ADVICE)
            .await
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub token: Token,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    pub query: String,
    #[serde(default)]
    pub available_tokens: Vec<Token>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextResponse {
    pub text: String,
}

/// Caller side of `/api/analyze` and `/api/advice`.
#[derive(Clone)]
pub struct AdvisorClient {
    http: reqwest::Client,
    base_url: String,
}

impl AdvisorClient {
    /// `base_url` is the proxy's `/api` root, e.g. `http://localhost:3000/api`.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn analyze_token(&self, token: &Token) -> String {
        let body = AnalyzeRequest {
            token: token.clone(),
        };
        match self.post_text("analyze", &body).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, symbol = %token.symbol, "Error analyzing token");
                ANALYSIS_FALLBACK.to_string()
            }
        }
    }

    pub async fn get_trading_advice(&self, query: &str, tokens: &[Token]) -> String {
        let body = AdviceRequest {
            query: query.to_string(),
            available_tokens: tokens.to_vec(),
        };
        match self.post_text("advice", &body).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Error getting advice");
                ADVICE_FALLBACK.to_string()
            }
        }
    }

    async fn post_text<B: Serialize>(&self, path: &str, body: &B) -> Result<String, AdvisorError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Status { status, body });
        }

        let parsed: TextResponse = response.json().await?;
        Ok(parsed.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// Running conversation with the assistant on the directory page.
#[derive(Clone)]
pub struct ChatSession {
    client: AdvisorClient,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(client: AdvisorClient) -> Self {
        Self {
            client,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Returns the assistant's reply, or `None` for a blank query (nothing is sent).
    pub async fn ask(&mut self, query: &str, tokens: &[Token]) -> Option<&ChatMessage> {
        if query.trim().is_empty() {
            return None;
        }
        self.history.push(ChatMessage {
            role: ChatRole::User,
            text: query.to_string(),
        });

        let mut answer = self.client.get_trading_advice(query, tokens).await;
        if answer.trim().is_empty() {
            answer = EMPTY_ANSWER.to_string();
        }
        self.history.push(ChatMessage {
            role: ChatRole::Assistant,
            text: answer,
        });
        self.history.last()
    }
}
