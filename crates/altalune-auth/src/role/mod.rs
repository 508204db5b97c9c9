//! Role and Permission Aggregate

pub mod claims_service;
pub mod entity;
pub mod repository;

pub use claims_service::{can, ClaimsService, UserClaims};
pub use entity::{Permission, Role, ROOT_PERMISSION};
pub use repository::RoleRepository;
