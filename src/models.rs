use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A row of the `profiles` table. The subscription columns mirror the gateway's
/// subscription object and are both NULL when the user holds no subscription.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    // 'user' or 'admin'.
    pub role: String,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
}

impl User {
    /// The user's current subscription reference, if both columns are populated.
    pub fn subscription(&self) -> Option<SubscriptionRef> {
        match (&self.subscription_id, &self.subscription_status) {
            (Some(id), Some(status)) => Some(SubscriptionRef {
                id: id.clone(),
                status: status.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// SubscriptionRef
///
/// The gateway-issued subscription id and its last known status
/// (`created`, `active`, ...). Returned by the payment verification endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubscriptionRef {
    #[schema(example = "sub_xxxxxxxxxxxxxx")]
    pub id: String,
    #[schema(example = "active")]
    pub status: String,
}

/// Payment
///
/// A verified payment stored in the `payments` table. Kept until the subscription
/// is cancelled so the refund window can be measured from `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub razorpay_payment_id: String,
    pub razorpay_subscription_id: String,
    pub razorpay_signature: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `Repository::create_payment`.
#[derive(Debug, Clone, Default)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub razorpay_payment_id: String,
    pub razorpay_subscription_id: String,
    pub razorpay_signature: String,
}

// --- Request Payloads (Input Schemas) ---

/// PaymentVerificationRequest
///
/// Body posted by the checkout widget's success callback (POST /paymentverification).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PaymentVerificationRequest {
    /// The payment ID generated by Razorpay.
    #[schema(example = "pay_xxxxxxxxxxxxxx")]
    pub razorpay_payment_id: String,
    /// The subscription ID generated by Razorpay.
    #[schema(example = "sub_xxxxxxxxxxxxxx")]
    pub razorpay_subscription_id: String,
    /// Hex HMAC-SHA256 signature over `payment_id|subscription_id`.
    pub razorpay_signature: String,
}

// --- Response Schemas (Output) ---

/// SubscribeResponse
///
/// Output of GET /subscribe. The client passes `subscription_id` to the checkout widget.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubscribeResponse {
    pub success: bool,
    #[schema(example = "sub_xxxxxxxxxxxxxx")]
    pub subscription_id: String,
}

/// RazorpayKeyResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RazorpayKeyResponse {
    pub success: bool,
    /// The Razorpay API key.
    #[schema(example = "rzp_xxxxxxxxxxxxxx")]
    pub key: String,
}

/// MessageResponse
///
/// Generic `{ success, message }` envelope. Also the shape of every error body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub success: bool,
    #[schema(example = "Subscription cancelled successfully.")]
    pub message: String,
}
