//! OTP Token Repository
//!
//! The rate limit is the count of codes issued for an email inside the
//! window; the check is best-effort (small races acceptable), the hard
//! limit is the per-window row count.

use chrono::{Duration, Utc};
use mongodb::options::ReturnDocument;
use mongodb::{bson::doc, Collection, Database};

use crate::login::otp::OtpToken;
use crate::shared::error::Result;

pub struct OtpTokenRepository {
    collection: Collection<OtpToken>,
}

impl OtpTokenRepository {
    const COLLECTION_NAME: &'static str = "otp_tokens";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, token: &OtpToken) -> Result<()> {
        self.collection.insert_one(token).await?;
        Ok(())
    }

    /// Atomically redeem the most recent unused, unexpired code matching
    /// the hash. Returns the row if this caller won.
    pub async fn consume_by_hash(&self, token_hash: &str) -> Result<Option<OtpToken>> {
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
            .sort(doc! { "createdAt": -1 })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(result)
    }

    /// Codes issued for an email within the recent window.
    pub async fn count_recent(&self, email: &str, window_secs: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::seconds(window_secs);
        let cutoff = bson::DateTime::from_chrono(cutoff);
        Ok(self
            .collection
            .count_documents(doc! {
                "email": email.trim().to_lowercase(),
                "createdAt": { "$gt": cutoff },
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
