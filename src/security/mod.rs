//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → origin.rs (apply X-Forwarded-*, check allow-listed origin)
//!     → Pass to routing
//!
//! Outgoing response:
//!     → csp.rs (merge x-<directive> overrides into Content-Security-Policy)
//! ```
//!
//! # Design Decisions
//! - Only the nearest proxy's forwarding headers are trusted
//! - The default policy is a constant; each response builds its own overlay
//! - Header mutation is all-or-nothing

pub mod csp;
pub mod origin;

pub use csp::{apply_policy, Policy, PolicyError, DEFAULT_DIRECTIVES};
pub use origin::{forwarded_url, origin_allowed};
