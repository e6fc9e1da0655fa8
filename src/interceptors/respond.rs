//! Static short-circuit interceptors.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};

use crate::exchange::Exchange;
use crate::flow::{Interceptor, InterceptorError, Outcome};

/// Answers the request itself and returns, so nothing later in the request
/// pass runs.
#[derive(Debug, Clone)]
pub struct Respond {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Respond {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.headers.insert(header::CONTENT_TYPE, content_type);
        self
    }
}

#[async_trait]
impl Interceptor for Respond {
    fn name(&self) -> &str {
        "respond"
    }

    async fn handle_request(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        let mut response = Response::new(self.body.clone());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        exc.set_response(response);
        Ok(Outcome::Return)
    }
}

/// Aborts the exchange, optionally leaving a response with a fixed status.
#[derive(Debug, Clone, Default)]
pub struct Fail {
    message: Option<String>,
    status: Option<StatusCode>,
}

impl Fail {
    pub fn new(message: Option<String>, status: Option<StatusCode>) -> Self {
        Self { message, status }
    }
}

#[async_trait]
impl Interceptor for Fail {
    fn name(&self) -> &str {
        "fail"
    }

    async fn handle_request(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        tracing::debug!(
            exchange = %exc.id(),
            reason = self.message.as_deref().unwrap_or("unspecified"),
            "failing exchange"
        );
        if let Some(status) = self.status {
            let body = self.message.clone().unwrap_or_default();
            let mut response = Response::new(Bytes::from(body));
            *response.status_mut() = status;
            exc.set_response(response);
        }
        Ok(Outcome::Abort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn exchange() -> Exchange {
        Exchange::new(Request::new(Bytes::new()))
    }

    #[tokio::test]
    async fn test_respond_sets_response_and_returns() {
        let mut exc = exchange();
        let respond = Respond::new(StatusCode::ACCEPTED, "queued")
            .with_content_type(HeaderValue::from_static("text/plain"));

        let outcome = respond.handle_request(&mut exc).await.unwrap();
        assert_eq!(outcome, Outcome::Return);

        let response = exc.response().unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.body(), &Bytes::from_static(b"queued"));
    }

    #[tokio::test]
    async fn test_fail_aborts_with_optional_response() {
        let mut exc = exchange();
        let outcome = Fail::default().handle_request(&mut exc).await.unwrap();
        assert_eq!(outcome, Outcome::Abort);
        assert!(exc.response().is_none());

        let fail = Fail::new(Some("forbidden".into()), Some(StatusCode::FORBIDDEN));
        fail.handle_request(&mut exc).await.unwrap();
        assert_eq!(exc.response().unwrap().status(), StatusCode::FORBIDDEN);
    }
}
