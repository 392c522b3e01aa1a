//! Access Control Middleware.
//! Enforces the client IP whitelist on every endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::security::whitelist::IpWhitelist;

/// Reject clients outside the whitelist before any handler runs.
///
/// Requests without connection info are refused by the extractor, so a
/// router served without `into_make_service_with_connect_info` fails closed.
pub async fn ip_whitelist_middleware(
    State(whitelist): State<Arc<IpWhitelist>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if whitelist.allows(addr.ip()) {
        return next.run(request).await;
    }

    tracing::warn!(
        client = %addr.ip(),
        path = %request.uri().path(),
        "Client address not in whitelist"
    );
    (StatusCode::FORBIDDEN, "Forbidden: client address not in whitelist\n").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn app(whitelist: &str, hits: Arc<AtomicUsize>) -> Router {
        let whitelist = Arc::new(IpWhitelist::parse(whitelist).unwrap());
        Router::new()
            .route(
                "/",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "ok"
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(whitelist, ip_whitelist_middleware))
    }

    fn request_from(addr: &str) -> Request<Body> {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let addr: SocketAddr = addr.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[tokio::test]
    async fn test_allowed_client_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let res = app("127.0.0.0/8", hits.clone())
            .oneshot(request_from("127.0.0.1:5000"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_client_never_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let res = app("10.0.0.0/8", hits.clone())
            .oneshot(request_from("192.168.1.7:5000"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_connect_info_fails_closed() {
        let hits = Arc::new(AtomicUsize::new(0));
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app("0.0.0.0/0", hits.clone()).oneshot(req).await.unwrap();
        assert_ne!(res.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
