//! Project Member Repository

use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::project::entity::{ProjectMember, ProjectRole};
use crate::shared::error::{AuthError, Result};

pub struct ProjectMemberRepository {
    collection: Collection<ProjectMember>,
}

impl ProjectMemberRepository {
    const COLLECTION_NAME: &'static str = "project_members";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION_NAME),
        }
    }

    pub async fn insert(&self, member: &ProjectMember) -> Result<()> {
        self.collection.insert_one(member).await?;
        Ok(())
    }

    pub async fn find(&self, project_id: &str, user_id: &str) -> Result<Option<ProjectMember>> {
        Ok(self
            .collection
            .find_one(doc! { "projectId": project_id, "userId": user_id })
            .await?)
    }

    /// All memberships of a user, for the token `memberships` claim.
    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<ProjectMember>> {
        let cursor = self.collection.find(doc! { "userId": user_id }).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Insert the membership if the user is not yet a member of the project.
    pub async fn insert_if_absent(&self, member: &ProjectMember) -> Result<bool> {
        if self.find(&member.project_id, &member.user_id).await?.is_some() {
            return Ok(false);
        }
        self.insert(member).await?;
        Ok(true)
    }

    pub async fn update_role(
        &self,
        project_id: &str,
        user_id: &str,
        role: ProjectRole,
    ) -> Result<bool> {
        if role != ProjectRole::Owner {
            self.guard_last_owner(project_id, user_id).await?;
        }

        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .update_one(
                doc! { "projectId": project_id, "userId": user_id },
                doc! { "$set": { "role": role.as_str(), "updatedAt": now } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn remove(&self, project_id: &str, user_id: &str) -> Result<bool> {
        self.guard_last_owner(project_id, user_id).await?;

        let result = self
            .collection
            .delete_one(doc! { "projectId": project_id, "userId": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn count_owners(&self, project_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "projectId": project_id, "role": "owner" })
            .await?)
    }

    /// Reject an operation that would leave the project without an owner.
    async fn guard_last_owner(&self, project_id: &str, user_id: &str) -> Result<()> {
        let member = self.find(project_id, user_id).await?;
        if let Some(member) = member {
            if member.role == ProjectRole::Owner && self.count_owners(project_id).await? <= 1 {
                return Err(AuthError::validation(
                    "A project must retain at least one owner",
                ));
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
