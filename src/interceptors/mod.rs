//! Built-in interceptors available from configuration.
//!
//! # Responsibilities
//! - `log`: request/response access lines through `tracing`
//! - `set_header` / `remove_header`: header edits on the current message
//! - `set_property`: writes to the exchange property bag
//! - `respond` / `fail`: static short-circuits (`Return` / `Abort`)
//! - `proxy`: forwards the request upstream and stores the response
//!
//! # Design Decisions
//! - Interceptors hold only immutable configuration; per-request state lives
//!   on the exchange
//! - Header names and values are parsed when the flow is built, not per request

pub mod headers;
pub mod log;
pub mod property;
pub mod proxy;
pub mod respond;

pub use headers::{RemoveHeader, SetHeader};
pub use log::LogInterceptor;
pub use property::SetProperty;
pub use proxy::ProxyInterceptor;
pub use respond::{Fail, Respond};
