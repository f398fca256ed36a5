use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::{Arc, Mutex};
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Number of billing cycles a new subscription is created for.
pub const SUBSCRIPTION_TOTAL_COUNT: u32 = 12;

/// GatewayError
///
/// Failure talking to the payment provider. The handler layer turns any of these
/// into a 502 without exposing the provider's response body.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("simulated gateway failure")]
    Simulated,
}

/// ProviderSubscription
///
/// The fields of the provider's subscription entity this service cares about.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: String,
}

// 1. PaymentGateway Contract
/// PaymentGateway
///
/// Abstract contract for the hosted payment provider. Handlers only see this trait,
/// so the real HTTP client can be swapped for `MockPaymentGateway` in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a recurring subscription against `plan_id` for `total_count` cycles.
    async fn create_subscription(
        &self,
        plan_id: &str,
        total_count: u32,
    ) -> Result<ProviderSubscription, GatewayError>;

    /// Cancels the subscription immediately.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError>;

    /// Issues a full refund for a captured payment.
    async fn refund_payment(&self, payment_id: &str) -> Result<(), GatewayError>;
}

// 2. The Real Implementation (Razorpay REST API)
/// RazorpayClient
///
/// Talks to the Razorpay v1 REST API with HTTP basic auth (key id / key secret).
#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(base_url: &str, key_id: &str, key_secret: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        }
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%url, status, error = %body, "Razorpay request failed");
            return Err(GatewayError::Rejected { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_subscription(
        &self,
        plan_id: &str,
        total_count: u32,
    ) -> Result<ProviderSubscription, GatewayError> {
        let response = self
            .post(
                "/subscriptions",
                serde_json::json!({
                    "plan_id": plan_id,
                    "customer_notify": 1,
                    "total_count": total_count,
                }),
            )
            .await?;

        Ok(response.json::<ProviderSubscription>().await?)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
        self.post(
            &format!("/subscriptions/{}/cancel", subscription_id),
            serde_json::json!({ "cancel_at_cycle_end": 0 }),
        )
        .await?;
        Ok(())
    }

    async fn refund_payment(&self, payment_id: &str) -> Result<(), GatewayError> {
        self.post(
            &format!("/payments/{}/refund", payment_id),
            serde_json::json!({}),
        )
        .await?;
        Ok(())
    }
}

// --- Signature Verification ---

/// sign_payment
///
/// Computes the signature the provider attaches to a successful subscription payment:
/// hex(HMAC-SHA256(key_secret, "{payment_id}|{subscription_id}")).
pub fn sign_payment(key_secret: &str, payment_id: &str, subscription_id: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key_secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(format!("{}|{}", payment_id, subscription_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// verify_payment_signature
///
/// Constant-time comparison of the posted signature with the expected one.
pub fn verify_payment_signature(
    key_secret: &str,
    payment_id: &str,
    subscription_id: &str,
    signature: &str,
) -> bool {
    let expected = sign_payment(key_secret, payment_id, subscription_id);
    let provided = signature.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() == 1
}

// 3. The Mock Implementation (For Tests)
/// MockPaymentGateway
///
/// In-process gateway used by the test suite. Issues deterministic ids and records
/// every call so tests can assert on side effects.
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    /// When true, all operations return `GatewayError::Simulated`.
    pub should_fail: bool,
    /// When true, only `refund_payment` fails.
    pub fail_refunds: bool,
    created: Arc<Mutex<Vec<String>>>,
    cancelled: Arc<Mutex<Vec<String>>>,
    refunded: Arc<Mutex<Vec<String>>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn new_refund_failing() -> Self {
        Self {
            fail_refunds: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn refunded(&self) -> Vec<String> {
        self.refunded.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_subscription(
        &self,
        plan_id: &str,
        _total_count: u32,
    ) -> Result<ProviderSubscription, GatewayError> {
        if self.should_fail {
            return Err(GatewayError::Simulated);
        }
        let id = format!("sub_mock_{}", plan_id);
        if let Ok(mut created) = self.created.lock() {
            created.push(id.clone());
        }
        Ok(ProviderSubscription {
            id,
            status: "created".to_string(),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
        if self.should_fail {
            return Err(GatewayError::Simulated);
        }
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.push(subscription_id.to_string());
        }
        Ok(())
    }

    async fn refund_payment(&self, payment_id: &str) -> Result<(), GatewayError> {
        if self.should_fail || self.fail_refunds {
            return Err(GatewayError::Simulated);
        }
        if let Ok(mut refunded) = self.refunded.lock() {
            refunded.push(payment_id.to_string());
        }
        Ok(())
    }
}

/// GatewayState
///
/// The concrete type used to share the gateway across the application state.
pub type GatewayState = Arc<dyn PaymentGateway>;
