use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    gateway::{self, SUBSCRIPTION_TOTAL_COUNT},
    models::{
        MessageResponse, NewPayment, PaymentVerificationRequest, RazorpayKeyResponse,
        SubscribeResponse, SubscriptionRef, User,
    },
    repository::RepositoryError,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Loads the caller's profile. The auth layer already proved it existed, but it may
/// have been removed since.
async fn load_user(state: &AppState, id: Uuid) -> Result<User, ApiError> {
    state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

// --- Handlers ---

/// buy_subscription
///
/// [Authenticated Route] Opens a new subscription at the gateway for the configured
/// plan and stores its id/status on the caller's profile. The client then completes
/// checkout with the returned id.
///
/// Admin accounts cannot subscribe.
#[utoipa::path(
    get,
    path = "/subscribe",
    tag = "Payment",
    security(("BearerAuth" = [])),
    responses(
        (status = 201, description = "Subscription created", body = SubscribeResponse),
        (status = 400, description = "Admin can't buy subscription", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse)
    )
)]
pub async fn buy_subscription(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    let user = load_user(&state, id).await?;

    if user.is_admin() {
        return Err(ApiError::BadRequest("Admin can't buy subscription".to_string()));
    }

    let subscription = state
        .gateway
        .create_subscription(&state.config.plan_id, SUBSCRIPTION_TOTAL_COUNT)
        .await?;

    state
        .repo
        .set_subscription(
            user.id,
            Some(SubscriptionRef {
                id: subscription.id.clone(),
                status: subscription.status,
            }),
        )
        .await?;

    tracing::info!(user_id = %user.id, subscription_id = %subscription.id, "subscription created");

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            success: true,
            subscription_id: subscription.id,
        }),
    ))
}

/// payment_verification
///
/// [Authenticated Route] Verify payment and save subscription details.
///
/// The signature is checked against the subscription id stored on the profile, not
/// the one in the body, so a payment for someone else's subscription cannot activate
/// this one. Nothing is persisted when verification fails.
#[utoipa::path(
    post,
    path = "/paymentverification",
    tag = "Payment",
    security(("BearerAuth" = [])),
    request_body = PaymentVerificationRequest,
    responses(
        (status = 200, description = "Returns the updated subscription details.", body = SubscriptionRef),
        (status = 400, description = "Malformed body, bad signature, or payment already verified", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse),
        (status = 404, description = "No subscription found", body = MessageResponse)
    )
)]
pub async fn payment_verification(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<PaymentVerificationRequest>, JsonRejection>,
) -> Result<Json<SubscriptionRef>, ApiError> {
    let Json(payload) = payload?;
    let user = load_user(&state, id).await?;

    let subscription_id = user
        .subscription_id
        .ok_or_else(|| ApiError::NotFound("No subscription found".to_string()))?;

    let authentic = gateway::verify_payment_signature(
        &state.config.razorpay_key_secret,
        &payload.razorpay_payment_id,
        &subscription_id,
        &payload.razorpay_signature,
    );

    if !authentic {
        tracing::warn!(
            user_id = %user.id,
            subscription_id = %subscription_id,
            payment_id = %payload.razorpay_payment_id,
            "payment signature mismatch"
        );
        return Err(ApiError::BadRequest("Payment verification failed".to_string()));
    }

    state
        .repo
        .create_payment(NewPayment {
            user_id: user.id,
            razorpay_payment_id: payload.razorpay_payment_id,
            razorpay_subscription_id: subscription_id.clone(),
            razorpay_signature: payload.razorpay_signature,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                ApiError::BadRequest("Payment already verified".to_string())
            }
            other => other.into(),
        })?;

    let active = SubscriptionRef {
        id: subscription_id,
        status: "active".to_string(),
    };

    let updated = state
        .repo
        .set_subscription(user.id, Some(active))
        .await?
        .and_then(|u| u.subscription())
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, subscription_id = %updated.id, "subscription activated");

    Ok(Json(updated))
}

/// get_razorpay_key
///
/// [Public Route] Get the Razorpay API key used to initialise client-side checkout.
#[utoipa::path(
    get,
    path = "/razorpaykey",
    tag = "Payment",
    responses((status = 200, description = "Returns the Razorpay API key.", body = RazorpayKeyResponse))
)]
pub async fn get_razorpay_key(State(state): State<AppState>) -> Json<RazorpayKeyResponse> {
    Json(RazorpayKeyResponse {
        success: true,
        key: state.config.razorpay_key_id.clone(),
    })
}

/// Outcome of settling the recorded payment once the gateway subscription is gone.
#[derive(Debug, PartialEq)]
enum Refund {
    Issued,
    NotDue,
    Failed,
}

/// Refunds the subscription's payment if it is inside `window`, then drops the record.
/// A failed refund leaves the record in place.
async fn settle_payment(
    state: &AppState,
    subscription_id: &str,
    window: Duration,
) -> Result<Refund, ApiError> {
    let Some(payment) = state
        .repo
        .find_payment_by_subscription(subscription_id)
        .await?
    else {
        return Ok(Refund::NotDue);
    };

    let refund = if Utc::now() - payment.created_at < window {
        state
            .gateway
            .refund_payment(&payment.razorpay_payment_id)
            .await?;
        Refund::Issued
    } else {
        Refund::NotDue
    };

    if let Err(e) = state.repo.delete_payment(payment.id).await {
        tracing::error!(payment_id = %payment.id, error = %e, "failed to delete settled payment");
    }

    Ok(refund)
}

/// cancel_subscription
///
/// [Authenticated Route] Cancel an active subscription.
///
/// If the recorded payment is younger than the refund window it is refunded in full.
/// Once the gateway has cancelled, the profile's subscription is cleared even when the
/// refund fails, since the gateway will not accept a second cancellation.
#[utoipa::path(
    delete,
    path = "/subscribe/cancel",
    tag = "Subscription",
    security(("BearerAuth" = [])),
    responses(
        (status = 200, description = "Returns a success message indicating the subscription was cancelled.", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse),
        (status = 404, description = "No active subscription", body = MessageResponse)
    )
)]
pub async fn cancel_subscription(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = load_user(&state, id).await?;

    let subscription_id = user
        .subscription_id
        .ok_or_else(|| ApiError::NotFound("No active subscription found".to_string()))?;

    let refund_days = state.config.refund_days;
    let window = Duration::try_days(refund_days)
        .filter(|window| *window >= Duration::zero())
        .ok_or_else(|| ApiError::Internal(format!("invalid refund window of {refund_days} days")))?;

    state.gateway.cancel_subscription(&subscription_id).await?;

    let refund = settle_payment(&state, &subscription_id, window)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(
                user_id = %user.id,
                subscription_id = %subscription_id,
                error = %e,
                "refund failed after gateway cancellation"
            );
            Refund::Failed
        });

    state.repo.set_subscription(user.id, None).await?;

    tracing::info!(user_id = %user.id, subscription_id = %subscription_id, ?refund, "subscription cancelled");

    let message = match refund {
        Refund::Issued => format!(
            "Subscription cancelled, You will receive full refund within {} days.",
            refund_days
        ),
        Refund::NotDue => format!(
            "Subscription cancelled, No refund initiated as subscription was cancelled after {} days.",
            refund_days
        ),
        Refund::Failed => {
            "Subscription cancelled, Refund could not be initiated. Please contact support."
                .to_string()
        }
    };

    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

/// not_found
///
/// Router fallback for paths outside the route table.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
