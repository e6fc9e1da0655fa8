//! The leaf contract implemented by every processing unit.

use async_trait::async_trait;
use thiserror::Error;

use crate::exchange::Exchange;
use crate::flow::Outcome;

/// Errors an interceptor can raise. The controller turns every one of them into
/// an abort and records it on the exchange.
#[derive(Debug, Error)]
pub enum InterceptorError {
    /// Upstream request could not be completed.
    #[error("upstream error: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// Upstream did not answer in time.
    #[error("upstream timeout after {0} seconds")]
    Timeout(u64),

    /// Building an HTTP message failed.
    #[error("http error: {0}")]
    Http(#[from] axum::http::Error),

    /// Reading a message body failed.
    #[error("body error: {0}")]
    Body(#[from] axum::Error),

    /// The handler panicked.
    #[error("interceptor panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Message(String),
}

impl InterceptorError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }
}

/// A processing unit attached to the flow.
///
/// Every handler is optional. Implementations are shared by all exchanges of a
/// route and must be safe to call concurrently.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    /// Name used in logs, metrics and failure records.
    fn name(&self) -> &str;

    async fn handle_request(&self, _exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        Ok(Outcome::Continue)
    }

    async fn handle_response(&self, _exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        Ok(Outcome::Continue)
    }

    /// Cleanup during an abort unwind.
    async fn handle_abort(&self, _exc: &mut Exchange) {}
}
