//! Audit Log Repository

use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::audit::entity::AuditLog;
use crate::shared::error::Result;

pub struct AuditLogRepository {
    collection: Collection<AuditLog>,
}

impl AuditLogRepository {
    const COLLECTION_NAME: &'static str = "audit_logs";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, entry: &AuditLog) -> Result<()> {
        self.collection.insert_one(entry).await?;
        Ok(())
    }

    pub async fn find_by_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<AuditLog>> {
        let cursor = self
            .collection
            .find(doc! { "entityType": entity_type, "entityId": entity_id })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
