//! Refresh Token Repository

use chrono::Utc;
use mongodb::options::ReturnDocument;
use mongodb::{bson::doc, Collection, Database};

use crate::oauth::refresh_token::RefreshToken;
use crate::shared::error::Result;

pub struct RefreshTokenRepository {
    collection: Collection<RefreshToken>,
}

impl RefreshTokenRepository {
    const COLLECTION_NAME: &'static str = "refresh_tokens";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, token: &RefreshToken) -> Result<()> {
        self.collection.insert_one(token).await?;
        Ok(())
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        Ok(self.collection.find_one(doc! { "_id": token }).await?)
    }

    /// Atomically consume a valid refresh token (rotation).
    ///
    /// Returns the token document if this caller won; `None` if the token
    /// is unknown, expired, or already rotated.
    pub async fn consume(&self, token: &str) -> Result<Option<RefreshToken>> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .find_one_and_update(
                doc! {
                    "_id": token,
                    "exchangeAt": { "$eq": null },
                    "expiresAt": { "$gt": now },
                },
                doc! { "$set": { "exchangeAt": now } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(result)
    }

    /// Consume every live token of a user for a client (logout-everywhere).
    pub async fn consume_all_for_user(&self, user_id: &str, client_id: &str) -> Result<u64> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .update_many(
                doc! {
                    "userId": user_id,
                    "clientId": client_id,
                    "exchangeAt": { "$eq": null },
                },
                doc! { "$set": { "exchangeAt": now } },
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
