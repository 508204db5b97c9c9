//! Shared Infrastructure

pub mod error;
pub mod health_api;
pub mod html;
pub mod ids;
pub mod indexes;
pub mod well_known_api;
