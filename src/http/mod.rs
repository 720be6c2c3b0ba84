//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (HashServer: axum serve via Router, stop sequence)
//!     → routing::Router::dispatch (template match, stats)
//!     → handlers.rs (method check, form/param parsing, store calls)
//!     → response.rs (JSON bodies, ApiError → status + text)
//!     → Send to client
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use response::{ApiError, HashResponse, MessageResponse, SubmitResponse};
pub use server::{HashServer, ServerError};
