//! User and Identity Repositories

use chrono::Utc;
use mongodb::{bson::doc, Collection, Database};

use crate::provider::entity::ProviderType;
use crate::shared::error::Result;
use crate::user::entity::User;
use crate::user::identity::UserIdentity;

/// Repository for user accounts.
pub struct UserRepository {
    collection: Collection<User>,
}

impl UserRepository {
    const COLLECTION_NAME: &'static str = "users";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, user: &User) -> Result<()> {
        self.collection.insert_one(user).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    /// Find a user by email. Lookup is by the stored lowercase form.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    pub async fn update(&self, user: &User) -> Result<bool> {
        let result = self
            .collection
            .replace_one(doc! { "_id": &user.id }, user)
            .await?;
        Ok(result.modified_count > 0)
    }

    /// Set the email-verified flag. Subsequent token issuance picks it up.
    pub async fn mark_email_verified(&self, user_id: &str) -> Result<bool> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "emailVerified": true, "updatedAt": now } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }
}

/// Repository for upstream identity links.
pub struct UserIdentityRepository {
    collection: Collection<UserIdentity>,
}

impl UserIdentityRepository {
    const COLLECTION_NAME: &'static str = "user_identities";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, identity: &UserIdentity) -> Result<()> {
        self.collection.insert_one(identity).await?;
        Ok(())
    }

    pub async fn find_by_user_and_provider(
        &self,
        user_id: &str,
        provider: ProviderType,
    ) -> Result<Option<UserIdentity>> {
        Ok(self
            .collection
            .find_one(doc! { "userId": user_id, "provider": provider.as_str() })
            .await?)
    }

    pub async fn update_last_login(&self, id: &str) -> Result<bool> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "lastLoginAt": now } })
            .await?;
        Ok(result.modified_count > 0)
    }
}

#[cfg(test)]
mod tests {
    // Repository tests require MongoDB connection
    // These would typically be integration tests
}
