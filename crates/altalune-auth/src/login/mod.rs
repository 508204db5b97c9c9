//! Login Flows
//!
//! Federated login, OTP login, and email verification.

pub mod login_api;
pub mod otp;
pub mod otp_api;
pub mod otp_repository;
pub mod verification;
pub mod verification_repository;

pub use login_api::{login_router, LoginState};
pub use otp::OtpToken;
pub use otp_api::{otp_router, OtpState};
pub use otp_repository::OtpTokenRepository;
pub use verification::EmailVerificationToken;
pub use verification_repository::VerificationTokenRepository;
