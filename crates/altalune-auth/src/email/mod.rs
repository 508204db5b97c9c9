//! Email Dispatch

pub mod resend;
pub mod sender;
#[cfg(feature = "ses")]
pub mod ses;

pub use resend::ResendSender;
pub use sender::{EmailSender, EmailService};
#[cfg(feature = "ses")]
pub use ses::SesSender;
