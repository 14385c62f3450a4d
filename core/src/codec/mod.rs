//! Wire codecs shared by the dispatcher and the event router.
//!
//! Decoding never fails: malformed input becomes `None` and the caller decides
//! whether absence is an error.

pub mod failure;
pub mod identifier;
pub mod payload;
pub mod profile;
pub mod transmission;

pub use failure::{FailureKind, FailureReason};
pub use identifier::{ApiKey, MessageId, PeerId, UserId};
pub use profile::PropagationProfile;
pub use transmission::TransmissionMode;
