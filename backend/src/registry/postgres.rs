use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::ProfileStore;
use crate::config::DatabaseConfig;
use crate::error::RegistryError;
use crate::model::StreamerProfile;

const PRIMARY_KEY: &str = "streamer_profiles_pkey";
const SLUG_CONSTRAINT: &str = "streamer_profiles_slug_key";
const WALLET_CONSTRAINT: &str = "streamer_profiles_wallet_address_key";

/// Registry error for a unique violation on `constraint`, if it is one we own.
fn unique_violation(constraint: Option<&str>, profile: &StreamerProfile) -> Option<RegistryError> {
    match constraint? {
        SLUG_CONSTRAINT => Some(RegistryError::SlugTaken(profile.slug.clone())),
        WALLET_CONSTRAINT => Some(RegistryError::WalletTaken(profile.wallet_address.clone())),
        PRIMARY_KEY => Some(RegistryError::IdCollision),
        _ => None,
    }
}

pub async fn get_db_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .context("Failed to connect to Postgres. Ensure the service is running.")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run registry migrations")?;

    Ok(pool)
}

/// Registry table `streamer_profiles`; uniqueness is enforced by its constraints.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn insert(&self, profile: &StreamerProfile) -> Result<(), RegistryError> {
        let result = sqlx::query(
            "INSERT INTO streamer_profiles (id, slug, display_name, wallet_address, partner_key)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&profile.id)
        .bind(&profile.slug)
        .bind(&profile.display_name)
        .bind(&profile.wallet_address)
        .bind(&profile.partner_key)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                match unique_violation(db.constraint(), profile) {
                    Some(err) => Err(err),
                    None => Err(RegistryError::Database(sqlx::Error::Database(db))),
                }
            }
            Err(e) => Err(RegistryError::Database(e)),
        }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<StreamerProfile>, RegistryError> {
        let profile = sqlx::query_as::<_, StreamerProfile>(
            "SELECT id, slug, display_name, wallet_address, partner_key
             FROM streamer_profiles WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_wallet(
        &self,
        wallet: &str,
    ) -> Result<Option<StreamerProfile>, RegistryError> {
        let profile = sqlx::query_as::<_, StreamerProfile>(
            "SELECT id, slug, display_name, wallet_address, partner_key
             FROM streamer_profiles WHERE wallet_address = $1",
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn list(&self) -> Result<Vec<StreamerProfile>, RegistryError> {
        let profiles = sqlx::query_as::<_, StreamerProfile>(
            "SELECT id, slug, display_name, wallet_address, partner_key
             FROM streamer_profiles ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }
}
