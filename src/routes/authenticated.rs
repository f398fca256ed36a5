use crate::{AppState, auth, handlers};
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Subscription lifecycle routes. The auth gate is attached to each method handler
/// rather than to the whole path, so a wrong verb falls through to the JSON 404
/// without being asked for credentials first.
pub fn authenticated_routes(state: AppState) -> Router<AppState> {
    let guard = middleware::from_fn_with_state(state, auth::require_auth);

    Router::<AppState>::new()
        // GET /subscribe
        // Opens a gateway subscription for the caller.
        .route(
            "/subscribe",
            get(handlers::buy_subscription).route_layer(guard.clone()),
        )
        // POST /paymentverification
        // Checks the checkout signature, records the payment and activates the subscription.
        .route(
            "/paymentverification",
            post(handlers::payment_verification).route_layer(guard.clone()),
        )
        // DELETE /subscribe/cancel
        // Cancels at the gateway, refunding when inside the refund window.
        .route(
            "/subscribe/cancel",
            delete(handlers::cancel_subscription).route_layer(guard),
        )
}
