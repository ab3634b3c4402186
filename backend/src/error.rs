use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("slug already taken: {0}")]
    SlugTaken(String),

    #[error("wallet already registered: {0}")]
    WalletTaken(String),

    #[error("slug must contain at least one letter or digit")]
    InvalidSlug,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The random row id already exists; the caller retries with a fresh one.
    #[error("profile id collision")]
    IdCollision,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("invalid swap: {0}")]
    InvalidInput(&'static str),
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("API_KEY is not configured")]
    MissingApiKey,

    #[error("http {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("model returned no text")]
    EmptyResponse,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Error body returned by every JSON route: `{ "error": "..." }`.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.code,
            Json(ErrorBody {
                error: &self.message,
            }),
        )
            .into_response()
    }
}

/// `Json<T>` whose rejection is an [`ApiError`], so a malformed body gets the
/// same `{ "error": .. }` shape as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::SlugTaken(_) => ApiError::conflict("slug already taken"),
            RegistryError::WalletTaken(_) => ApiError::conflict("wallet already registered"),
            RegistryError::InvalidSlug | RegistryError::MissingField(_) => {
                ApiError::bad_request(err.to_string())
            }
            RegistryError::IdCollision => {
                tracing::error!("profile id collided on every attempt");
                ApiError::internal("registry unavailable")
            }
            RegistryError::Database(e) => {
                tracing::error!(error = %e, "registry query failed");
                ApiError::internal("registry unavailable")
            }
        }
    }
}

impl From<SwapError> for ApiError {
    fn from(err: SwapError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}
