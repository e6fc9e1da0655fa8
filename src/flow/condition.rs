//! Predicates for `Conditional` and `Choice` nodes.
//!
//! # Design Decisions
//! - Predicates are pure reads of the exchange; they never mutate it
//! - Header tests look at the message of the current phase: the request during
//!   the request pass, the response afterwards (false while none exists)
//! - Expressions are compiled once at config load; header names are pre-parsed

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::Value;

use crate::exchange::Exchange;
use crate::flow::Flow;

/// A predicate evaluated against the exchange in a given phase.
pub trait Condition: Send + Sync + 'static {
    fn test(&self, exc: &Exchange, flow: Flow) -> bool;
}

impl<F> Condition for F
where
    F: Fn(&Exchange, Flow) -> bool + Send + Sync + 'static,
{
    fn test(&self, exc: &Exchange, flow: Flow) -> bool {
        self(exc, flow)
    }
}

/// Compiled condition expression built from configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Header is present on the current message.
    Header(HeaderName),
    HeaderEquals(HeaderName, HeaderValue),
    /// Request method matches.
    Method(Method),
    /// Request path starts with the prefix.
    PathPrefix(String),
    /// Property is set and neither `null` nor `false`.
    Property(String),
    PropertyEquals(String, Value),
    /// Response status matches (false while there is no response).
    Status(StatusCode),
    /// Evaluation happens in this phase.
    Flow(Flow),
    Not(Box<Expression>),
    All(Vec<Expression>),
    Any(Vec<Expression>),
}

impl Expression {
    pub fn evaluate(&self, exc: &Exchange, flow: Flow) -> bool {
        match self {
            Expression::Header(name) => {
                headers_for(exc, flow).is_some_and(|h| h.contains_key(name))
            }
            Expression::HeaderEquals(name, value) => {
                headers_for(exc, flow).is_some_and(|h| h.get(name) == Some(value))
            }
            Expression::Method(method) => exc.request().method() == method,
            Expression::PathPrefix(prefix) => exc.request().uri().path().starts_with(prefix),
            Expression::Property(key) => {
                !matches!(exc.property(key), None | Some(Value::Null) | Some(Value::Bool(false)))
            }
            Expression::PropertyEquals(key, expected) => exc.property(key) == Some(expected),
            Expression::Status(status) => exc.response().is_some_and(|r| r.status() == *status),
            Expression::Flow(expected) => *expected == flow,
            Expression::Not(inner) => !inner.evaluate(exc, flow),
            Expression::All(all) => all.iter().all(|e| e.evaluate(exc, flow)),
            Expression::Any(any) => any.iter().any(|e| e.evaluate(exc, flow)),
        }
    }
}

impl Condition for Expression {
    fn test(&self, exc: &Exchange, flow: Flow) -> bool {
        self.evaluate(exc, flow)
    }
}

fn headers_for(exc: &Exchange, flow: Flow) -> Option<&HeaderMap> {
    match flow {
        Flow::Request => Some(exc.request().headers()),
        Flow::Response | Flow::Abort => exc.response().map(|r| r.headers()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{Request, Response};

    fn exchange() -> Exchange {
        let req = Request::builder()
            .method("POST")
            .uri("http://example.com/api/orders")
            .header("x-debug", "1")
            .body(Bytes::new())
            .unwrap();
        Exchange::new(req)
    }

    #[test]
    fn test_header_reads_current_message() {
        let mut exc = exchange();
        let expr = Expression::Header(HeaderName::from_static("x-debug"));
        assert!(expr.evaluate(&exc, Flow::Request));
        // No response yet
        assert!(!expr.evaluate(&exc, Flow::Response));

        let resp = Response::builder()
            .header("x-debug", "on")
            .body(Bytes::new())
            .unwrap();
        exc.set_response(resp);
        assert!(expr.evaluate(&exc, Flow::Response));

        let equals = Expression::HeaderEquals(
            HeaderName::from_static("x-debug"),
            HeaderValue::from_static("1"),
        );
        assert!(equals.evaluate(&exc, Flow::Request));
        assert!(!equals.evaluate(&exc, Flow::Response));
    }

    #[test]
    fn test_request_line_tests() {
        let exc = exchange();
        assert!(Expression::Method(Method::POST).evaluate(&exc, Flow::Request));
        assert!(!Expression::Method(Method::GET).evaluate(&exc, Flow::Request));
        assert!(Expression::PathPrefix("/api".into()).evaluate(&exc, Flow::Response));
        assert!(!Expression::PathPrefix("/admin".into()).evaluate(&exc, Flow::Request));
    }

    #[test]
    fn test_property_truthiness() {
        let mut exc = exchange();
        let expr = Expression::Property("cached".into());
        assert!(!expr.evaluate(&exc, Flow::Request));

        exc.set_property("cached", false);
        assert!(!expr.evaluate(&exc, Flow::Request));

        exc.set_property("cached", "yes");
        assert!(expr.evaluate(&exc, Flow::Request));
        assert!(Expression::PropertyEquals("cached".into(), Value::from("yes"))
            .evaluate(&exc, Flow::Request));
    }

    #[test]
    fn test_combinators() {
        let mut exc = exchange();
        exc.set_response(
            Response::builder()
                .status(404)
                .body(Bytes::new())
                .unwrap(),
        );

        let not_found = Expression::Status(StatusCode::NOT_FOUND);
        let in_response = Expression::Flow(Flow::Response);
        let all = Expression::All(vec![not_found.clone(), in_response.clone()]);
        assert!(all.evaluate(&exc, Flow::Response));
        assert!(!all.evaluate(&exc, Flow::Request));

        let any = Expression::Any(vec![
            Expression::Method(Method::GET),
            not_found,
        ]);
        assert!(any.evaluate(&exc, Flow::Request));
        assert!(Expression::Not(Box::new(in_response)).evaluate(&exc, Flow::Request));
    }

    #[test]
    fn test_closure_condition() {
        let exc = exchange();
        let cond = |exc: &Exchange, flow: Flow| flow == Flow::Request && exc.request().method() == Method::POST;
        assert!(cond.test(&exc, Flow::Request));
        assert!(!cond.test(&exc, Flow::Response));
    }
}
