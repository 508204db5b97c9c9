//! User Aggregate

pub mod entity;
pub mod identity;
pub mod registration;
pub mod repository;

pub use entity::User;
pub use identity::UserIdentity;
pub use registration::RegistrationService;
pub use repository::{UserIdentityRepository, UserRepository};
