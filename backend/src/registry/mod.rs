//! Profile registry: slug and wallet both resolve to at most one streamer.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::ids::random_base36;
use crate::model::{NewProfile, StreamerProfile};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const PARTNER_KEY_PREFIX: &str = "pk_bags_";

/// Fresh id/key pairs tried before an id collision is surfaced.
const INSERT_ATTEMPTS: usize = 3;

/// Storage backend. Uniqueness of `slug` and `wallet_address` is the
/// backend's job; `insert` reports a violation as `SlugTaken`/`WalletTaken`,
/// or `IdCollision` when the generated id is already in use.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert(&self, profile: &StreamerProfile) -> Result<(), RegistryError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<StreamerProfile>, RegistryError>;
    async fn find_by_wallet(&self, wallet: &str)
        -> Result<Option<StreamerProfile>, RegistryError>;
    async fn list(&self) -> Result<Vec<StreamerProfile>, RegistryError>;
}

#[derive(Clone)]
pub struct ProfileRegistry {
    store: Arc<dyn ProfileStore>,
}

impl ProfileRegistry {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub async fn create(&self, request: NewProfile) -> Result<StreamerProfile, RegistryError> {
        let wallet_address = request.wallet_address.trim();
        let display_name = request.display_name.trim();
        if wallet_address.is_empty() {
            return Err(RegistryError::MissingField("walletAddress"));
        }
        if display_name.is_empty() {
            return Err(RegistryError::MissingField("displayName"));
        }
        let slug = normalize_slug(&request.slug);
        if slug.is_empty() {
            return Err(RegistryError::InvalidSlug);
        }

        let mut attempt = 1;
        loop {
            let (id, partner_key) = {
                let mut rng = rand::thread_rng();
                (
                    random_base36(&mut rng, 8),
                    format!("{PARTNER_KEY_PREFIX}{}", random_base36(&mut rng, 8)),
                )
            };

            let profile = StreamerProfile {
                id,
                slug: slug.clone(),
                display_name: display_name.to_string(),
                wallet_address: wallet_address.to_string(),
                partner_key,
            };

            match self.store.insert(&profile).await {
                Ok(()) => {
                    tracing::info!(slug = %profile.slug, wallet = %profile.wallet_address, "registered streamer");
                    return Ok(profile);
                }
                Err(RegistryError::IdCollision) if attempt < INSERT_ATTEMPTS => {
                    tracing::warn!(id = %profile.id, attempt, "profile id collision, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<StreamerProfile>, RegistryError> {
        let slug = normalize_slug(slug);
        if slug.is_empty() {
            return Ok(None);
        }
        self.store.find_by_slug(&slug).await
    }

    pub async fn get_by_wallet(
        &self,
        wallet_address: &str,
    ) -> Result<Option<StreamerProfile>, RegistryError> {
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() {
            return Ok(None);
        }
        self.store.find_by_wallet(wallet_address).await
    }

    pub async fn get_all(&self) -> Result<Vec<StreamerProfile>, RegistryError> {
        self.store.list().await
    }
}

/// Lowercase and drop anything outside `[a-z0-9]`.
pub fn normalize_slug(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}
