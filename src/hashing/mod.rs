//! Deferred hashing subsystem.
//!
//! # Data Flow
//! ```text
//! submit(secret)
//!     → store.rs (allocate id, mark outstanding, spawn task)
//!     → [sleep for the configured delay]
//!     → digest.rs (SHA-512 → hex → base64)
//!     → store.rs (commit under lock, clear outstanding)
//!
//! fetch(id) → Ready(digest) | Pending | Unknown
//! drain()   → resolves once nothing is outstanding
//! ```

pub mod digest;
pub mod store;

pub use digest::digest;
pub use store::{Lookup, SubmissionId, SubmissionStore, DEFAULT_DELAY};
