//! Email Verification Token Repository

use chrono::Utc;
use mongodb::options::ReturnDocument;
use mongodb::{bson::doc, Collection, Database};

use crate::login::verification::EmailVerificationToken;
use crate::shared::error::Result;

pub struct VerificationTokenRepository {
    collection: Collection<EmailVerificationToken>,
}

impl VerificationTokenRepository {
    const COLLECTION_NAME: &'static str = "email_verification_tokens";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, token: &EmailVerificationToken) -> Result<()> {
        self.collection.insert_one(token).await?;
        Ok(())
    }

    /// Atomically redeem an unused, unexpired token matching the hash.
    pub async fn consume_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<EmailVerificationToken>> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .find_one_and_update(
                doc! {
                    "tokenHash": token_hash,
                    "usedAt": { "$eq": null },
                    "expiresAt": { "$gt": now },
                },
                doc! { "$set": { "usedAt": now } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
