//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (request ID, body buffering)
//!     → routing picks the route and its flow
//!     → flow::FlowController runs the exchange
//!     → response.rs (exchange → response or problem details)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ProblemDetails;
pub use server::HttpServer;
