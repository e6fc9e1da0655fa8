//! Interceptor flow gateway library.
//!
//! Requests are matched to a route and driven through that route's tree of
//! interceptors: a request pass down the tree, then a response or abort pass
//! back up over the interceptors that were entered.

pub mod config;
pub mod exchange;
pub mod flow;
pub mod http;
pub mod interceptors;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use exchange::{Exchange, ExchangeState, FlowFailure};
pub use flow::{Flow, FlowController, FlowFilter, Interceptor, InterceptorError, Node, Outcome};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
