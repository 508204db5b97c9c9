//! Upstream Provider Aggregate

pub mod entity;
pub mod github;
pub mod google;
pub mod repository;
pub mod service;
pub mod upstream;

pub use entity::{OAuthProvider, ProviderType};
pub use repository::OAuthProviderRepository;
pub use service::ProviderService;
pub use upstream::{build_upstream_client, UpstreamClient, UpstreamUserInfo};
