//! Shared utilities for flow and gateway integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Request, Uri};
use axum::response::IntoResponse;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use interceptor_proxy::config::parse_config;
use interceptor_proxy::{
    Exchange, ExchangeState, FlowController, HttpServer, Interceptor, InterceptorError, Node,
    Outcome, ProxyConfig, Shutdown,
};

pub const TRACE: &str = "trace";

/// What a handler does after recording itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Act {
    Continue,
    Return,
    Abort,
    Fail,
    Panic,
}

impl Act {
    fn perform(self, name: &str) -> Result<Outcome, InterceptorError> {
        match self {
            Act::Continue => Ok(Outcome::Continue),
            Act::Return => Ok(Outcome::Return),
            Act::Abort => Ok(Outcome::Abort),
            Act::Fail => Err(InterceptorError::message(format!("{} failed", name))),
            Act::Panic => panic!("{} panicked", name),
        }
    }
}

/// Appends `>name`, `<name` or `?name` to the `trace` property.
pub struct Mark {
    name: String,
    request: Act,
    response: Act,
}

impl Mark {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            request: Act::Continue,
            response: Act::Continue,
        }
    }

    pub fn on_request(mut self, act: Act) -> Self {
        self.request = act;
        self
    }

    pub fn on_response(mut self, act: Act) -> Self {
        self.response = act;
        self
    }
}

#[async_trait]
impl Interceptor for Mark {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_request(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        record(exc, '>', &self.name);
        self.request.perform(&self.name)
    }

    async fn handle_response(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        record(exc, '<', &self.name);
        self.response.perform(&self.name)
    }

    async fn handle_abort(&self, exc: &mut Exchange) {
        record(exc, '?', &self.name);
    }
}

/// A unit that leaves no trace and answers the request pass with `act`.
pub struct Signal {
    name: &'static str,
    act: Act,
}

#[async_trait]
impl Interceptor for Signal {
    fn name(&self) -> &str {
        self.name
    }

    async fn handle_request(&self, _exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        self.act.perform(self.name)
    }
}

fn record(exc: &mut Exchange, sign: char, name: &str) {
    let mut trace = exc.property_str(TRACE).unwrap_or_default().to_string();
    trace.push(sign);
    trace.push_str(name);
    exc.set_property(TRACE, trace);
}

pub fn mark(name: &str) -> Node {
    Node::leaf(Mark::new(name))
}

pub fn returning() -> Node {
    Node::leaf(Signal { name: "return", act: Act::Return })
}

pub fn aborting() -> Node {
    Node::leaf(Signal { name: "abort", act: Act::Abort })
}

pub fn failing() -> Node {
    Node::leaf(Signal { name: "error", act: Act::Fail })
}

pub fn panicking() -> Node {
    Node::leaf(Signal { name: "panic", act: Act::Panic })
}

pub fn exchange() -> Exchange {
    Exchange::new(Request::builder().uri("/test").body(Bytes::new()).unwrap())
}

pub fn trace(exc: &Exchange) -> String {
    exc.property_str(TRACE).unwrap_or_default().to_string()
}

/// Run `nodes` as a root sequence on a fresh exchange.
pub async fn run(nodes: Vec<Node>) -> (String, ExchangeState, Exchange) {
    let root = Node::sequence(nodes);
    let mut exc = exchange();
    let state = FlowController::new().run(&root, &mut exc).await;
    (trace(&exc), state, exc)
}

/// Start a backend that echoes method and URI, reporting the
/// `x-from-gateway` request header back as `x-seen`.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
        let seen = headers
            .get("x-from-gateway")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        (
            [("x-backend", "echo".to_string()), ("x-seen", seen)],
            format!("{} {}", method, uri),
        )
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = axum::Router::new().fallback(echo);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A running gateway; shut down when dropped.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<ProxyConfig>,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: &str) -> TestGateway {
    let config = parse_config(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        addr,
        updates,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
