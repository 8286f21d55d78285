pub mod checkin_token;
pub mod common;
pub mod config;
pub mod init;
pub mod outbound;
pub mod secret;
pub mod share_submission;

// Re-export common types/enums for easier access
pub use checkin_token::{CheckInToken, IssuedToken, TokenPurpose};
pub use common::*;
pub use config::SwitchConfig;
pub use outbound::{OutboundBody, OutboundMessage, Reminder};
pub use secret::{Disclosure, DisclosureState, Recipient, ReminderState, Schedule, Secret, SecretSummary};
pub use share_submission::ShareSubmission;
