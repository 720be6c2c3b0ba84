//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, query)
//!     → router.rs (start timer)
//!     → matcher.rs (first template whose shape matches, bind parameters)
//!     → params.rs (RouteParams extension: logical path + parameter set)
//!     → handler registered under the literal or template path, or 404
//!     → StatsTracker records "<path> <method>" with the elapsed time
//!
//! Route Compilation (at startup):
//!     register_route(path, handler)
//!     → templates parsed once into literal/param segments
//!     → Router frozen behind Arc when serving starts
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (positional segment comparison only)
//! - Deterministic: templates are tried in registration order

pub mod matcher;
pub mod params;
pub mod router;

pub use matcher::{is_parameterized, split_path, PathTemplate, RouteMatch, Segment, TemplateError};
pub use params::RouteParams;
pub use router::{Handler, Router, RouterError, RouterState, STATS_PATH};
