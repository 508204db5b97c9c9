//! Role Repository

use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::role::entity::Role;
use crate::shared::error::Result;

pub struct RoleRepository {
    collection: Collection<Role>,
}

impl RoleRepository {
    const COLLECTION_NAME: &'static str = "roles";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, role: &Role) -> Result<()> {
        self.collection.insert_one(role).await?;
        Ok(())
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Role>> {
        Ok(self.collection.find_one(doc! { "code": code }).await?)
    }

    pub async fn find_by_codes(&self, codes: &[String]) -> Result<Vec<Role>> {
        if codes.is_empty() {
            return Ok(vec![]);
        }
        let cursor = self
            .collection
            .find(doc! { "code": { "$in": codes } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Insert built-in roles that are not present yet.
    pub async fn seed_built_in(&self) -> Result<()> {
        for role in crate::role::entity::roles::all() {
            if self.find_by_code(&role.code).await?.is_none() {
                self.insert(&role).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
