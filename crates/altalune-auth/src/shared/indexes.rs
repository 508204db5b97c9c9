//! MongoDB Index Initialization
//!
//! Creates the unique indexes backing the data-model invariants on
//! application startup.

use mongodb::{bson::doc, options::IndexOptions, Database, IndexModel};
use tracing::info;

/// Initialize all MongoDB indexes
pub async fn initialize_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    info!("Initializing MongoDB indexes...");

    create_user_indexes(db).await?;
    create_project_member_indexes(db).await?;
    create_client_indexes(db).await?;
    create_token_indexes(db).await?;
    create_misc_indexes(db).await?;

    info!("MongoDB indexes initialized successfully");
    Ok(())
}

async fn create_user_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let users = db.collection::<mongodb::bson::Document>("users");

    // Email lookup (globally unique, lowercase at write time)
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    // One identity per provider per user
    let identities = db.collection::<mongodb::bson::Document>("user_identities");
    identities
        .create_index(
            IndexModel::builder()
                .keys(doc! { "userId": 1, "provider": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    info!("Created indexes on users");
    Ok(())
}

async fn create_project_member_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let members = db.collection::<mongodb::bson::Document>("project_members");

    members
        .create_index(
            IndexModel::builder()
                .keys(doc! { "projectId": 1, "userId": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    members
        .create_index(IndexModel::builder().keys(doc! { "userId": 1 }).build())
        .await?;

    info!("Created indexes on project_members");
    Ok(())
}

async fn create_client_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let clients = db.collection::<mongodb::bson::Document>("oauth_clients");

    clients
        .create_index(
            IndexModel::builder()
                .keys(doc! { "clientId": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    // Name unique within a project
    clients
        .create_index(
            IndexModel::builder()
                .keys(doc! { "projectId": 1, "name": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    info!("Created indexes on oauth_clients");
    Ok(())
}

async fn create_token_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Codes and refresh tokens are keyed by their value (_id); expiry
    // checks read expiresAt.
    for name in ["authorization_codes", "refresh_tokens"] {
        db.collection::<mongodb::bson::Document>(name)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "expiresAt": 1 })
                    .build(),
            )
            .await?;
    }

    let otps = db.collection::<mongodb::bson::Document>("otp_tokens");
    otps.create_index(
        IndexModel::builder()
            .keys(doc! { "email": 1, "createdAt": -1 })
            .build(),
    )
    .await?;
    otps.create_index(IndexModel::builder().keys(doc! { "tokenHash": 1 }).build())
        .await?;

    db.collection::<mongodb::bson::Document>("email_verification_tokens")
        .create_index(IndexModel::builder().keys(doc! { "tokenHash": 1 }).build())
        .await?;

    info!("Created indexes on token collections");
    Ok(())
}

async fn create_misc_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    db.collection::<mongodb::bson::Document>("user_consents")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "userId": 1, "clientId": 1 })
                .build(),
        )
        .await?;

    db.collection::<mongodb::bson::Document>("roles")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "code": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    db.collection::<mongodb::bson::Document>("audit_logs")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "entityType": 1, "entityId": 1 })
                .build(),
        )
        .await?;

    info!("Created indexes on consents, roles, audit_logs");
    Ok(())
}
