//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener, stop on the shutdown broadcast
//! - Dispatch requests to the routing engine and run the route's flow
//! - Swap the route table when a new configuration arrives
//! - Observability (metrics, correlation IDs)

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{GatewayConfig, ProxyConfig};
use crate::exchange::{Exchange, ExchangeState};
use crate::flow::{BuildError, FlowBuilder, FlowController};
use crate::http::request::{buffer_request, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{exchange_response, ProblemDetails};
use crate::interceptors::proxy::UpstreamClient;
use crate::observability::metrics;
use crate::routing::Router as RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub controller: FlowController,
    pub gateway: Arc<GatewayConfig>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    routes: Arc<ArcSwap<RouteTable>>,
    client: UpstreamClient,
}

impl HttpServer {
    /// Create a new HTTP server, building every route flow of `config`.
    pub fn new(config: ProxyConfig) -> Result<Self, BuildError> {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let builder = FlowBuilder::with_client(client.clone(), &config.timeouts);
        let routes = Arc::new(ArcSwap::from_pointee(RouteTable::from_config(
            &config.routes,
            &builder,
        )?));

        let state = AppState {
            routes: routes.clone(),
            controller: FlowController::new(),
            gateway: Arc::new(config.gateway.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            routes,
            client,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.gateway.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configurations received on `config_updates` replace the route table;
    /// listener, limits and timeouts stay as they were at startup.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.load().len(),
            "HTTP server starting"
        );

        let routes = self.routes.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                apply_config(&routes, client.clone(), &new_config);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Rebuild the route table from `config` and swap it in. A config whose
/// flows fail to build leaves the current table untouched.
pub(crate) fn apply_config(
    routes: &ArcSwap<RouteTable>,
    client: UpstreamClient,
    config: &ProxyConfig,
) -> bool {
    let builder = FlowBuilder::with_client(client, &config.timeouts);
    match RouteTable::from_config(&config.routes, &builder) {
        Ok(table) => {
            tracing::info!(routes = table.len(), "Route table reloaded");
            routes.store(Arc::new(table));
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to rebuild routes, keeping current table");
            false
        }
    }
}

/// Catch-all handler: match a route, run its flow, send what the flow produced.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    let routes = state.routes.load_full();
    let Some(route) = routes.match_request(&parts) else {
        tracing::warn!(method = %parts.method, path = %parts.uri.path(), "No route matched");
        metrics::record_request("none", 404, Duration::ZERO);
        return ProblemDetails::new(StatusCode::NOT_FOUND, "No route matches this request")
            .into_response();
    };

    let request = match buffer_request(parts, body, state.gateway.max_body_bytes).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(route = %route.name, error = %e, "Failed to read request body");
            metrics::record_request(&route.name, 413, Duration::ZERO);
            return ProblemDetails::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Request body exceeds {} bytes", state.gateway.max_body_bytes),
            )
            .into_response();
        }
    };

    let mut exc = Exchange::new(request)
        .with_remote_addr(addr)
        .with_route(route.name.clone());

    tracing::debug!(
        exchange = %exc.id(),
        route = %route.name,
        method = %exc.request().method(),
        path = %exc.request().uri().path(),
        "Running flow"
    );

    let outcome = state.controller.run(&route.flow, &mut exc).await;
    if outcome == ExchangeState::Aborted {
        metrics::record_abort(&route.name);
    }

    let elapsed = exc.elapsed();
    let response = exchange_response(exc, state.gateway.production);
    metrics::record_request(&route.name, response.status().as_u16(), elapsed);
    response
}
