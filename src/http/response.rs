//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn a finished exchange into the client response
//! - Map exchanges without a response to RFC 7807 problem details
//!
//! # Design Decisions
//! - A response set by the flow is sent as-is, even when the exchange aborted
//! - Failure diagnostics are only exposed outside production

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::exchange::{Exchange, ExchangeState};
use crate::flow::Flow;

pub const PROBLEM_JSON: &str = "application/problem+json";

/// RFC 7807 problem document.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Exchange id of the failed request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureDetail {
    pub interceptor: String,
    pub flow: Flow,
    pub error: String,
}

impl ProblemDetails {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            kind: "about:blank".to_string(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: Some(detail.into()),
            instance: None,
            failures: Vec::new(),
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_vec(&self).unwrap_or_default();
        (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON))],
            body,
        )
            .into_response()
    }
}

/// Convert a finished exchange into the client response.
pub fn exchange_response(mut exc: Exchange, production: bool) -> Response {
    if let Some(response) = exc.take_response() {
        let (parts, body) = response.into_parts();
        return Response::from_parts(parts, Body::from(body));
    }

    let detail = match exc.state() {
        ExchangeState::Aborted => "The request flow aborted without producing a response",
        _ => "The request flow completed without producing a response",
    };
    let mut problem =
        ProblemDetails::new(StatusCode::INTERNAL_SERVER_ERROR, detail).with_instance(exc.id());

    if !production {
        problem.failures = exc
            .failures()
            .iter()
            .map(|f| FailureDetail {
                interceptor: f.interceptor.clone(),
                flow: f.flow,
                error: f.error.to_string(),
            })
            .collect();
    }

    problem.into_response()
}
