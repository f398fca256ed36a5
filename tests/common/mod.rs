#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use payments_api::{
    AppConfig, AppState, MockPaymentGateway,
    auth::Claims,
    models::{NewPayment, Payment, SubscriptionRef, User},
    repository::{Repository, RepositoryError, RepositoryState},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::SystemTime,
};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
pub const TEST_KEY_SECRET: &str = "rzp_test_secret";
pub const TEST_USER_ID: Uuid = Uuid::from_u128(1);
pub const TEST_ADMIN_ID: Uuid = Uuid::from_u128(2);

// --- In-memory Repository ---

#[derive(Default)]
pub struct MockRepo {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub payments: Mutex<Vec<Payment>>,
    /// When true, every call returns a repository error.
    pub should_fail: bool,
}

impl MockRepo {
    pub fn with_users(users: Vec<User>) -> Self {
        let repo = Self::default();
        {
            let mut map = repo.users.lock().unwrap();
            for user in users {
                map.insert(user.id, user);
            }
        }
        repo
    }

    /// Seeds a payment with an explicit `created_at` so refund windows can be tested.
    pub fn seed_payment(&self, user_id: Uuid, subscription_id: &str, created_at: DateTime<Utc>) {
        self.payments.lock().unwrap().push(Payment {
            id: Uuid::new_v4(),
            user_id,
            razorpay_payment_id: format!("pay_for_{}", subscription_id),
            razorpay_subscription_id: subscription_id.to_string(),
            razorpay_signature: "seeded".to_string(),
            created_at,
        });
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn payment_count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::Other("mock repository failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        Ok(self.user(id))
    }

    async fn set_subscription(
        &self,
        user_id: Uuid,
        subscription: Option<SubscriptionRef>,
    ) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(&user_id).map(|user| {
            user.subscription_id = subscription.as_ref().map(|s| s.id.clone());
            user.subscription_status = subscription.map(|s| s.status);
            user.clone()
        }))
    }

    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        self.check()?;
        let mut payments = self.payments.lock().unwrap();
        if payments
            .iter()
            .any(|p| p.razorpay_payment_id == payment.razorpay_payment_id)
        {
            return Err(RepositoryError::Conflict(
                "duplicate razorpay_payment_id".to_string(),
            ));
        }
        let row = Payment {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            razorpay_payment_id: payment.razorpay_payment_id,
            razorpay_subscription_id: payment.razorpay_subscription_id,
            razorpay_signature: payment.razorpay_signature,
            created_at: Utc::now(),
        };
        payments.push(row.clone());
        Ok(row)
    }

    async fn find_payment_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        self.check()?;
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.razorpay_subscription_id == subscription_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn delete_payment(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.check()?;
        let mut payments = self.payments.lock().unwrap();
        let before = payments.len();
        payments.retain(|p| p.id != id);
        Ok(payments.len() < before)
    }
}

// --- Fixtures ---

pub fn plain_user() -> User {
    User {
        id: TEST_USER_ID,
        email: "user@example.com".to_string(),
        name: "Test User".to_string(),
        role: "user".to_string(),
        subscription_id: None,
        subscription_status: None,
    }
}

pub fn subscribed_user(subscription_id: &str, status: &str) -> User {
    User {
        subscription_id: Some(subscription_id.to_string()),
        subscription_status: Some(status.to_string()),
        ..plain_user()
    }
}

pub fn admin_user() -> User {
    User {
        id: TEST_ADMIN_ID,
        email: "admin@example.com".to_string(),
        name: "Admin".to_string(),
        role: "admin".to_string(),
        subscription_id: None,
        subscription_status: None,
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    config.razorpay_key_id = "rzp_test_public".to_string();
    config.razorpay_key_secret = TEST_KEY_SECRET.to_string();
    config.plan_id = "plan_test".to_string();
    config
}

pub fn create_state(repo: Arc<MockRepo>, gateway: MockPaymentGateway, config: AppConfig) -> AppState {
    let repo: RepositoryState = repo;
    AppState {
        repo,
        gateway: Arc::new(gateway),
        config,
    }
}

/// Mints a bearer token; a negative offset yields an already-expired token.
pub fn create_token(user_id: Uuid, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", create_token(user_id, 3600))
}
