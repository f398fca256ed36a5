use crate::models::{NewPayment, Payment, SubscriptionRef, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, name, role, subscription_id, subscription_status";
const PAYMENT_COLUMNS: &str =
    "id, user_id, razorpay_payment_id, razorpay_subscription_id, razorpay_signature, created_at";

/// RepositoryError
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}

/// Repository Trait
///
/// Persistence contract for user subscription state and payment records. Handlers
/// depend on `Arc<dyn Repository>` only, so tests can plug in an in-memory double.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// Overwrites the user's subscription columns. `None` clears both.
    /// Returns the updated user, or `None` if no such user exists.
    async fn set_subscription(
        &self,
        user_id: Uuid,
        subscription: Option<SubscriptionRef>,
    ) -> Result<Option<User>, RepositoryError>;

    // --- Payments ---
    /// Fails with `RepositoryError::Conflict` if the gateway payment id is already recorded.
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError>;

    /// Most recent payment recorded against a gateway subscription id.
    async fn find_payment_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Payment>, RepositoryError>;

    /// Returns true if a row was deleted.
    async fn delete_payment(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM profiles WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_subscription(
        &self,
        user_id: Uuid,
        subscription: Option<SubscriptionRef>,
    ) -> Result<Option<User>, RepositoryError> {
        let (sub_id, sub_status) = match subscription {
            Some(s) => (Some(s.id), Some(s.status)),
            None => (None, None),
        };

        let query = format!(
            "UPDATE profiles SET subscription_id = $2, subscription_status = $3 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .bind(sub_id)
            .bind(sub_status)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let query = format!(
            "INSERT INTO payments \
             (id, user_id, razorpay_payment_id, razorpay_subscription_id, razorpay_signature, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING {PAYMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Payment>(&query)
            .bind(Uuid::new_v4())
            .bind(payment.user_id)
            .bind(payment.razorpay_payment_id)
            .bind(payment.razorpay_subscription_id)
            .bind(payment.razorpay_signature)
            .fetch_one(&self.pool)
            .await;

        match row {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(RepositoryError::Conflict(db.message().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_payment_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE razorpay_subscription_id = $1 ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, Payment>(&query)
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_payment(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
