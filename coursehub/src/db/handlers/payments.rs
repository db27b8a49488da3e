//! Database repository for payment records.
//!
//! A payment row is the source of truth for one checkout attempt, keyed by
//! the provider order id until completion. Status transitions are enforced
//! here with conditional updates so concurrent callbacks cannot double-drive
//! the state machine.

use crate::db::{
    errors::Result,
    models::payments::{PaymentCreateDBRequest, PaymentDBResponse, PaymentStatus},
};
use crate::types::{CourseId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Outcome of driving a payment to `completed`.
#[derive(Debug)]
pub enum CompletionOutcome {
    /// The row transitioned `pending -> completed` in this call
    Completed(PaymentDBResponse),
    /// The row was already `completed`; benign on callback retries
    AlreadyCompleted(PaymentDBResponse),
    /// No payment with this provider order id exists
    NotFound,
    /// The row is `failed` or `refunded`; completion would violate the
    /// monotonic state machine
    InvalidTransition(PaymentDBResponse),
}

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Persist a new payment record in `pending` state.
    #[instrument(skip(self, request), fields(order_id = %request.razorpay_order_id), err)]
    pub async fn create(&mut self, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse> {
        let payment_id = Uuid::new_v4();

        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            INSERT INTO payments
                (id, amount, currency, receipt, status, payment_id, razorpay_order_id,
                 user_id, course_id, payment_method, notes)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(request.amount)
        .bind(request.currency)
        .bind(&request.receipt)
        .bind(&request.payment_id)
        .bind(&request.razorpay_order_id)
        .bind(request.user_id)
        .bind(request.course_id)
        .bind(&request.payment_method)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_order_id(&mut self, order_id: &str) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>("SELECT * FROM payments WHERE razorpay_order_id = $1")
            .bind(order_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payment)
    }

    /// Latest payment record for a (user, course) pair, regardless of status.
    #[instrument(skip(self, user_id, course_id), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn latest_for_user_course(&mut self, user_id: UserId, course_id: CourseId) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            SELECT * FROM payments
            WHERE user_id = $1 AND course_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payment)
    }

    /// Drive the payment identified by `order_id` to `completed`, recording
    /// the real provider payment id.
    ///
    /// The transition is a single conditional UPDATE guarded on
    /// `status = 'pending'`: of two concurrent callbacks exactly one
    /// performs the transition and the other observes `AlreadyCompleted`.
    #[instrument(skip(self), err)]
    pub async fn complete_by_order_id(&mut self, order_id: &str, provider_payment_id: &str) -> Result<CompletionOutcome> {
        let transitioned = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            UPDATE payments
            SET status = 'completed', payment_id = $2, updated_at = NOW()
            WHERE razorpay_order_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(provider_payment_id)
        .fetch_optional(&mut *self.db)
        .await?;

        if let Some(payment) = transitioned {
            return Ok(CompletionOutcome::Completed(payment));
        }

        // No pending row transitioned: distinguish missing, already
        // completed, and invalid-transition cases.
        match self.get_by_order_id(order_id).await? {
            None => Ok(CompletionOutcome::NotFound),
            Some(payment) if payment.status == PaymentStatus::Completed => Ok(CompletionOutcome::AlreadyCompleted(payment)),
            Some(payment) => Ok(CompletionOutcome::InvalidTransition(payment)),
        }
    }

    /// Completed payments whose user lacks the corresponding entitlement.
    ///
    /// A crash between the status transition and the entitlement grant leaves
    /// such rows behind; a reconciliation job can re-drive them.
    #[instrument(skip(self), err)]
    pub async fn find_unreconciled(&mut self) -> Result<Vec<PaymentDBResponse>> {
        let payments = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            SELECT p.* FROM payments p
            WHERE p.status = 'completed'
              AND NOT EXISTS (
                  SELECT 1 FROM purchased_courses pc
                  WHERE pc.user_id = p.user_id AND pc.course_id = p.course_id
              )
            ORDER BY p.created_at
            "#,
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payments)
    }
}
