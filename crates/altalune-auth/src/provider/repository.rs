//! OAuth Provider Repository

use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::provider::entity::{OAuthProvider, ProviderType};
use crate::shared::error::Result;

pub struct OAuthProviderRepository {
    collection: Collection<OAuthProvider>,
}

impl OAuthProviderRepository {
    const COLLECTION_NAME: &'static str = "oauth_providers";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, provider: &OAuthProvider) -> Result<()> {
        self.collection.insert_one(provider).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<OAuthProvider>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn list_enabled(&self) -> Result<Vec<OAuthProvider>> {
        let cursor = self.collection.find(doc! { "enabled": true }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_enabled_by_type(
        &self,
        provider_type: ProviderType,
    ) -> Result<Option<OAuthProvider>> {
        Ok(self
            .collection
            .find_one(doc! { "providerType": provider_type.as_str(), "enabled": true })
            .await?)
    }

    pub async fn update(&self, provider: &OAuthProvider) -> Result<bool> {
        let result = self
            .collection
            .replace_one(doc! { "_id": &provider.id }, provider)
            .await?;
        Ok(result.modified_count > 0)
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
