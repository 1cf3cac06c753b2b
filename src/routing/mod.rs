//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, headers)
//!     → router.rs (walk entries in registration order)
//!     → matcher.rs (evaluate path patterns, capture params)
//!     → exchange.rs (request/response/flags handed to each handler)
//!     → Return: response, or a NoMatch / Error fallback
//!
//! Route Compilation (at startup):
//!     Manifest routes (sorted by order)
//!     → Compile patterns
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First route match wins; middleware see every request

pub mod exchange;
pub mod matcher;
pub mod router;

pub use exchange::{Exchange, RequestFlags};
pub use matcher::{Params, Pattern, PatternError};
pub use router::{from_fn, BoxError, Fallback, Handle, HandleError, Router, RouterBuilder, StatusFallback};
