use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ProfileStore;
use crate::error::RegistryError;
use crate::model::StreamerProfile;

/// Demo-mode store. Kept in registration order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: RwLock<Vec<StreamerProfile>>,
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert(&self, profile: &StreamerProfile) -> Result<(), RegistryError> {
        let mut profiles = self.profiles.write().await;
        if profiles.iter().any(|p| p.id == profile.id) {
            return Err(RegistryError::IdCollision);
        }
        if profiles.iter().any(|p| p.slug == profile.slug) {
            return Err(RegistryError::SlugTaken(profile.slug.clone()));
        }
        if profiles
            .iter()
            .any(|p| p.wallet_address == profile.wallet_address)
        {
            return Err(RegistryError::WalletTaken(profile.wallet_address.clone()));
        }
        profiles.push(profile.clone());
        Ok(())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<StreamerProfile>, RegistryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.slug == slug).cloned())
    }

    async fn find_by_wallet(
        &self,
        wallet: &str,
    ) -> Result<Option<StreamerProfile>, RegistryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.wallet_address == wallet).cloned())
    }

    async fn list(&self) -> Result<Vec<StreamerProfile>, RegistryError> {
        Ok(self.profiles.read().await.clone())
    }
}
