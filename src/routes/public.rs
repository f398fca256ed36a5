use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without an identity. Nothing here reads or writes
/// per-user state.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /razorpaykey
        // Public key id the client needs to open the checkout widget.
        .route("/razorpaykey", get(handlers::get_razorpay_key))
}
