//! OAuth Client Repository
//!
//! Read paths used to serve API responses go through
//! [`OAuthClientRepository::find_redacted`], which strips the secret hash
//! at the projection level. The unredacted lookups exist for the token
//! endpoint's secret verification and the audited reveal path only.

use chrono::Utc;
use mongodb::{bson::doc, Collection, Database};

use crate::client::entity::OAuthClient;
use crate::shared::error::Result;

pub struct OAuthClientRepository {
    collection: Collection<OAuthClient>,
}

impl OAuthClientRepository {
    const COLLECTION_NAME: &'static str = "oauth_clients";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, client: &OAuthClient) -> Result<()> {
        self.collection.insert_one(client).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<OAuthClient>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    /// Lookup by OAuth client_id (the wire identifier).
    pub async fn find_by_client_id(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        Ok(self
            .collection
            .find_one(doc! { "clientId": client_id })
            .await?)
    }

    /// Lookup with the secret hash stripped. Use for anything that renders
    /// a client back to a caller.
    pub async fn find_redacted(&self, id: &str) -> Result<Option<OAuthClient>> {
        Ok(self.find_by_id(id).await?.map(|mut client| {
            client.client_secret_hash = None;
            client
        }))
    }

    pub async fn find_by_project_and_name(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<OAuthClient>> {
        Ok(self
            .collection
            .find_one(doc! { "projectId": project_id, "name": name })
            .await?)
    }

    pub async fn find_default_for_project(&self, project_id: &str) -> Result<Option<OAuthClient>> {
        Ok(self
            .collection
            .find_one(doc! { "projectId": project_id, "isDefault": true })
            .await?)
    }

    pub async fn update(&self, client: &OAuthClient) -> Result<bool> {
        let result = self
            .collection
            .replace_one(doc! { "_id": &client.id }, client)
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn update_secret_hash(&self, id: &str, secret_hash: &str) -> Result<bool> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "clientSecretHash": secret_hash, "updatedAt": now } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
