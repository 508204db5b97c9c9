//! Authorization Code Repository
//!
//! Consumption uses a single conditional update: only the caller whose
//! update transitions `exchange_at` from null wins; concurrent consumers
//! see no document and must fail with `invalid_grant`.

use chrono::Utc;
use mongodb::options::ReturnDocument;
use mongodb::{bson::doc, Collection, Database};

use crate::oauth::authorization_code::AuthorizationCode;
use crate::shared::error::Result;

pub struct AuthorizationCodeRepository {
    collection: Collection<AuthorizationCode>,
}

impl AuthorizationCodeRepository {
    const COLLECTION_NAME: &'static str = "authorization_codes";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, code: &AuthorizationCode) -> Result<()> {
        self.collection.insert_one(code).await?;
        Ok(())
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        Ok(self.collection.find_one(doc! { "_id": code }).await?)
    }

    /// Atomically consume a valid code.
    ///
    /// Returns the code document if this caller won the exchange; `None`
    /// if the code is unknown, expired, or already consumed.
    pub async fn consume(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .find_one_and_update(
                doc! {
                    "_id": code,
                    "exchangeAt": { "$eq": null },
                    "expiresAt": { "$gt": now },
                },
                doc! { "$set": { "exchangeAt": now } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(result)
    }

    /// Consumed and expired rows are retained for audit; cleanup is an
    /// orthogonal maintenance concern.
    pub async fn count_valid(&self) -> Result<u64> {
        let now = bson::DateTime::from_chrono(Utc::now());
        Ok(self
            .collection
            .count_documents(doc! {
                "exchangeAt": { "$eq": null },
                "expiresAt": { "$gt": now },
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
