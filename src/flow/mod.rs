//! Interceptor flow engine.
//!
//! # Data Flow
//! ```text
//! [[routes]].flow (config)
//!     → builder.rs (NodeConfig → Node, interceptors instantiated)
//!     → Arc<Node> (immutable, shared by every exchange of the route)
//!
//! per request:
//!     transport → FlowController::run(&node, &mut exchange)
//!         → request pass (outcome.rs decides when to stop)
//!         → unwind over the entered stack (stack.rs)
//!     → exchange holds response or aborted state
//! ```
//!
//! # Design Decisions
//! - Composites are one closed enum; the controller is the only interpreter
//! - Interceptors see only the exchange, never the tree
//! - Conditions are plain predicates; compiled expressions live in condition.rs

pub mod builder;
pub mod condition;
pub mod controller;
pub mod interceptor;
pub mod node;
pub mod outcome;
mod stack;

pub use builder::{BuildError, FlowBuilder};
pub use condition::{Condition, Expression};
pub use controller::FlowController;
pub use interceptor::{Interceptor, InterceptorError};
pub use node::{Case, Leaf, Node};
pub use outcome::{Flow, FlowFilter, Outcome};
