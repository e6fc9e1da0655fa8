//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) unless the client sent one
//! - Echo the request ID on the response
//! - Buffer the request body up to the configured limit
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing; it becomes the exchange id
//! - The body is buffered only after routing, so unmatched requests are cheap

use axum::body::{Body, Bytes};
use axum::http::{request::Parts, HeaderName, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Sets `x-request-id` on requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Copies the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Read the whole body into memory. Fails once `limit` bytes are exceeded.
pub async fn buffer_request(
    parts: Parts,
    body: Body,
    limit: usize,
) -> Result<Request<Bytes>, axum::Error> {
    let bytes = axum::body::to_bytes(body, limit).await?;
    Ok(Request::from_parts(parts, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffer_request_respects_limit() {
        let (parts, body) = Request::builder()
            .uri("/upload")
            .body(Body::from("0123456789"))
            .unwrap()
            .into_parts();
        let request = buffer_request(parts, body, 10).await.unwrap();
        assert_eq!(request.body().as_ref(), b"0123456789");
        assert_eq!(request.uri().path(), "/upload");

        let (parts, body) = Request::builder()
            .body(Body::from("0123456789"))
            .unwrap()
            .into_parts();
        assert!(buffer_request(parts, body, 9).await.is_err());
    }
}
