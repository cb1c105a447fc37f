//! Core data model types: account ids, attachment references, payloads.

pub mod account;
pub mod attachment;
pub mod payload;

pub use account::AccountId;
pub use attachment::{AttachmentKind, AttachmentMeta, AttachmentRef, SaveOptions};
pub use payload::Payload;
