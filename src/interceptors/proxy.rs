//! Upstream forwarding interceptor.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the configured upstream
//! - Strip hop-by-hop headers, propagate the exchange id as `x-request-id`
//! - Enforce the upstream timeout
//! - Store the buffered upstream response on the exchange
//!
//! # Design Decisions
//! - Connect errors and timeouts are interceptor errors, so the flow aborts
//! - No retries here; a flow that wants a fallback uses an abort-recovery block

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use std::time::Duration;

use crate::exchange::Exchange;
use crate::flow::{Interceptor, InterceptorError, Outcome};

/// Shared upstream HTTP client type.
pub type UpstreamClient = Client<HttpConnector, Body>;

const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

const HOP_BY_HOP: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Forwards the request to an upstream and stores its response.
#[derive(Clone)]
pub struct ProxyInterceptor {
    client: UpstreamClient,
    /// scheme://authority
    origin: String,
    /// Base path without trailing slash, possibly empty.
    base_path: String,
    timeout: Duration,
}

impl ProxyInterceptor {
    pub fn new(client: UpstreamClient, target: &Uri, timeout: Duration) -> Self {
        let scheme = target.scheme_str().unwrap_or("http");
        let authority = target.authority().map(|a| a.as_str()).unwrap_or_default();
        Self {
            client,
            origin: format!("{}://{}", scheme, authority),
            base_path: target.path().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn upstream_uri(&self, original: &Uri) -> Result<Uri, InterceptorError> {
        let path_and_query = original
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let uri = format!("{}{}{}", self.origin, self.base_path, path_and_query);
        uri.parse::<Uri>()
            .map_err(|e| InterceptorError::Http(e.into()))
    }
}

#[async_trait]
impl Interceptor for ProxyInterceptor {
    fn name(&self) -> &str {
        "proxy"
    }

    async fn handle_request(&self, exc: &mut Exchange) -> Result<Outcome, InterceptorError> {
        let original = exc.request();
        let uri = self.upstream_uri(original.uri())?;

        let mut upstream = Request::builder()
            .method(original.method().clone())
            .uri(uri.clone())
            .body(Body::from(original.body().clone()))?;

        let headers = upstream.headers_mut();
        for (name, value) in original.headers() {
            if name != header::HOST {
                headers.append(name.clone(), value.clone());
            }
        }
        strip_hop_by_hop(headers);
        if let Ok(id) = HeaderValue::from_str(exc.id()) {
            headers.insert("x-request-id", id);
        }

        tracing::debug!(exchange = %exc.id(), upstream = %uri, "forwarding request");

        let secs = self.timeout.as_secs();
        let response: Response<Incoming> =
            tokio::time::timeout(self.timeout, self.client.request(upstream))
                .await
                .map_err(|_| InterceptorError::Timeout(secs))??;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        let bytes = axum::body::to_bytes(Body::new(body), MAX_RESPONSE_BYTES).await?;

        exc.set_response(Response::from_parts(parts, bytes));
        exc.set_property("proxy.upstream", self.origin.clone());
        Ok(Outcome::Continue)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
    headers.remove(header::UPGRADE);
}
