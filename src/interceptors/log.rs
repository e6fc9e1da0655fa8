//! Access logging interceptor.

use async_trait::async_trait;

use crate::exchange::Exchange;
use crate::flow::{Interceptor, InterceptorError, Outcome};

/// Logs each request on the way in and its status on the way out.
#[derive(Debug, Clone)]
pub struct LogInterceptor {
    label: String,
}

impl LogInterceptor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl Interceptor for LogInterceptor {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle_request(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        let req = exc.request();
        tracing::info!(
            label = %self.label,
            exchange = %exc.id(),
            method = %req.method(),
            path = %req.uri().path(),
            "request"
        );
        Ok(Outcome::Continue)
    }

    async fn handle_response(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        let status = exc.response().map(|r| r.status().as_u16());
        tracing::info!(
            label = %self.label,
            exchange = %exc.id(),
            status = ?status,
            elapsed_ms = exc.elapsed().as_millis() as u64,
            "response"
        );
        Ok(Outcome::Continue)
    }

    async fn handle_abort(&self, exc: &mut Exchange) {
        tracing::warn!(
            label = %self.label,
            exchange = %exc.id(),
            failures = exc.failures().len(),
            "exchange aborted"
        );
    }
}
