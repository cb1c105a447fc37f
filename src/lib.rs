//! `receiptbox` — local attachment storage for family finance records.
//!
//! Receipts, invoices and statements are saved per account under a storage
//! root, listed back by account, and read as `data:` URLs for display.

pub mod config;
pub mod error;
pub mod mime;
pub mod model;
pub mod store;

pub use error::{Result, StoreError};
pub use model::{AccountId, AttachmentKind, AttachmentRef, Payload, SaveOptions};
pub use store::AttachmentStore;
