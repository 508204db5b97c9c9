//! OAuth Client Aggregate

pub mod entity;
pub mod repository;
pub mod service;

pub use entity::OAuthClient;
pub use repository::OAuthClientRepository;
pub use service::{CreateClientParams, CreatedClient, OAuthClientService};
