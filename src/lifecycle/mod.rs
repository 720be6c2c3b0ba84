//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown requests (shutdown.rs):
//!     GET /shutdown ─┐
//!     SIGINT/SIGTERM ┴→ Shutdown::trigger → HashServer control task
//!
//! Stop sequence (run by HashServer):
//!     Router::shutdown (stop accepting, finish in-flight)
//!     → SubmissionStore::drain (every pending digest committed)
//!     → exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accepting first, then drain deferred work
//! - No forced deadline; scheduled digests always run to completion

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{forward_signals, wait_for_signal};
