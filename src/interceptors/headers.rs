//! Header editing interceptors.
//!
//! Request-phase calls edit the request, response-phase calls edit the
//! response. A response-phase call without a response is a no-op.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::exchange::Exchange;
use crate::flow::{Interceptor, InterceptorError, Outcome};

/// Sets (replaces) a header.
#[derive(Debug, Clone)]
pub struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

#[async_trait]
impl Interceptor for SetHeader {
    fn name(&self) -> &str {
        "set_header"
    }

    async fn handle_request(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        exc.request_mut()
            .headers_mut()
            .insert(self.name.clone(), self.value.clone());
        Ok(Outcome::Continue)
    }

    async fn handle_response(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        if let Some(headers) = response_headers(exc) {
            headers.insert(self.name.clone(), self.value.clone());
        }
        Ok(Outcome::Continue)
    }
}

/// Removes every value of a header.
#[derive(Debug, Clone)]
pub struct RemoveHeader {
    name: HeaderName,
}

impl RemoveHeader {
    pub fn new(name: HeaderName) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Interceptor for RemoveHeader {
    fn name(&self) -> &str {
        "remove_header"
    }

    async fn handle_request(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        exc.request_mut().headers_mut().remove(&self.name);
        Ok(Outcome::Continue)
    }

    async fn handle_response(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        if let Some(headers) = response_headers(exc) {
            headers.remove(&self.name);
        }
        Ok(Outcome::Continue)
    }
}

fn response_headers(exc: &mut Exchange) -> Option<&mut HeaderMap> {
    exc.response_mut().map(|r| r.headers_mut())
}
