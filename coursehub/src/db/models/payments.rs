//! Database models for payment records.

use crate::types::{CourseId, PaymentId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;

/// Supported settlement currencies, stored as TEXT in the database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
    Eur,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Inr => write!(f, "INR"),
            Currency::Usd => write!(f, "USD"),
            Currency::Eur => write!(f, "EUR"),
        }
    }
}

/// Payment lifecycle state, stored as TEXT in the database.
///
/// Transitions are monotonic: `pending -> completed | failed`, and
/// `completed -> refunded` is the only further transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// Database request for creating a new payment record (always `pending`)
#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub amount: Decimal,
    pub currency: Currency,
    pub receipt: String,
    /// Provider payment id; set to the order id until the real one is known
    pub payment_id: String,
    pub razorpay_order_id: String,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub payment_method: String,
    pub notes: Option<String>,
}

/// Database response for a payment row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentDBResponse {
    pub id: PaymentId,
    pub amount: Decimal,
    pub currency: Currency,
    pub receipt: String,
    pub status: PaymentStatus,
    pub payment_id: String,
    pub razorpay_order_id: Option<String>,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub payment_method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
