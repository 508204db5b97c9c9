//! Altalune shared infrastructure.
//!
//! Currently hosts the logging bootstrap used by every binary in the
//! workspace. Domain logic lives in `altalune-auth`.

pub mod logging;
