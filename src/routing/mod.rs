//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request head (host, path, method)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Route (with its flow tree) or None
//!
//! Route Compilation (startup and every reload):
//!     RouteConfig[]
//!     → Build each flow (flow::builder)
//!     → Sort by priority
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled up front, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod router;

pub use router::{Route, Router};
