//! Deferred password hashing service library.

pub mod config;
pub mod hashing;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ServiceConfig;
pub use hashing::SubmissionStore;
pub use http::HashServer;
pub use lifecycle::Shutdown;
pub use routing::Router;
