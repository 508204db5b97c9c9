//! User Consent Repository

use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::oauth::consent::UserConsent;
use crate::shared::error::Result;

pub struct UserConsentRepository {
    collection: Collection<UserConsent>,
}

impl UserConsentRepository {
    const COLLECTION_NAME: &'static str = "user_consents";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, consent: &UserConsent) -> Result<()> {
        self.collection.insert_one(consent).await?;
        Ok(())
    }

    /// Active (non-revoked) consents for a user/client pair.
    pub async fn find_active(&self, user_id: &str, client_id: &str) -> Result<Vec<UserConsent>> {
        let cursor = self
            .collection
            .find(doc! {
                "userId": user_id,
                "clientId": client_id,
                "revokedAt": { "$eq": null },
            })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Whether an active consent covers the requested scope set.
    pub async fn is_satisfied(
        &self,
        user_id: &str,
        client_id: &str,
        requested_scope: &str,
    ) -> Result<bool> {
        let consents = self.find_active(user_id, client_id).await?;
        Ok(consents.iter().any(|c| c.covers(requested_scope)))
    }

    /// Record a consent grant. Previous active consents for the pair are
    /// revoked so the newest grant is authoritative.
    pub async fn upsert_grant(&self, user_id: &str, client_id: &str, scope: &str) -> Result<()> {
        let now = bson::DateTime::from_chrono(Utc::now());
        self.collection
            .update_many(
                doc! {
                    "userId": user_id,
                    "clientId": client_id,
                    "revokedAt": { "$eq": null },
                },
                doc! { "$set": { "revokedAt": now } },
            )
            .await?;

        self.insert(&UserConsent::new(user_id, client_id, scope)).await
    }

    /// Revoke all active consents for a user/client pair.
    pub async fn revoke(&self, user_id: &str, client_id: &str) -> Result<u64> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .update_many(
                doc! {
                    "userId": user_id,
                    "clientId": client_id,
                    "revokedAt": { "$eq": null },
                },
                doc! { "$set": { "revokedAt": now } },
            )
            .await?;
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
