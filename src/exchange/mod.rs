//! Per-request state threaded through the interceptor flow.
//!
//! # Data Flow
//! ```text
//! transport accepts request
//!     → Exchange::new (request buffered, state = Received)
//!     → FlowController::run mutates it (headers, response, properties)
//!     → state = Completed | Aborted
//!     → transport writes the response back
//! ```
//!
//! # Design Decisions
//! - One Exchange per request, never shared between traversals
//! - Properties are JSON values so units stay decoupled from each other's types
//! - Failures are recorded, not thrown; the transport decides what the client sees

use axum::body::Bytes;
use axum::http::{Request, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::flow::{Flow, InterceptorError};

/// Lifecycle status of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeState {
    /// Built by the transport, flow not finished yet.
    Received,
    /// The unwind finished in normal mode.
    Completed,
    /// The unwind finished in abort mode.
    Aborted,
}

/// A failure raised by an interceptor and normalized to an abort.
#[derive(Debug)]
pub struct FlowFailure {
    /// Name of the interceptor that failed.
    pub interceptor: String,
    /// Phase the failure happened in.
    pub flow: Flow,
    pub error: InterceptorError,
}

/// Mutable state for one client call.
#[derive(Debug)]
pub struct Exchange {
    id: String,
    request: Request<Bytes>,
    response: Option<Response<Bytes>>,
    properties: HashMap<String, Value>,
    state: ExchangeState,
    failures: Vec<FlowFailure>,
    route: Option<String>,
    remote_addr: Option<SocketAddr>,
    received_at: Instant,
}

impl Exchange {
    /// Create an exchange for a buffered inbound request.
    ///
    /// The exchange id is taken from `x-request-id` when present.
    pub fn new(request: Request<Bytes>) -> Self {
        let id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            id,
            request,
            response: None,
            properties: HashMap::new(),
            state: ExchangeState::Received,
            failures: Vec::new(),
            route: None,
            remote_addr: None,
            received_at: Instant::now(),
        }
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Bytes> {
        &mut self.request
    }

    pub fn response(&self) -> Option<&Response<Bytes>> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut Response<Bytes>> {
        self.response.as_mut()
    }

    /// Set (or replace) the response.
    pub fn set_response(&mut self, response: Response<Bytes>) {
        self.response = Some(response);
    }

    /// Remove and return the response, leaving the exchange without one.
    pub fn take_response(&mut self) -> Option<Response<Bytes>> {
        self.response.take()
    }

    /// Read a property.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Read a property holding a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Write a property, returning the previous value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn set_state(&mut self, state: ExchangeState) {
        self.state = state;
    }

    pub fn is_aborted(&self) -> bool {
        self.state == ExchangeState::Aborted
    }

    /// Record an interceptor failure for diagnostics.
    pub fn record_failure(&mut self, failure: FlowFailure) {
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[FlowFailure] {
        &self.failures
    }

    /// Name of the route that matched this exchange, if any.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Time since the transport accepted the request.
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }
}
