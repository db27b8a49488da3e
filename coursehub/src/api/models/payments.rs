//! API request/response models for the checkout flow.

use crate::db::models::payments::{Currency, PaymentDBResponse, PaymentStatus};
use crate::payment_providers::ProviderOrder;
use crate::types::{CourseId, PaymentId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::courses::CourseResponse;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(rename = "courseId")]
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    #[schema(value_type = String, example = "499.00")]
    pub amount: Decimal,
    /// Settlement currency; defaults to INR
    pub currency: Option<Currency>,
    /// Merchant receipt string; generated when absent, truncated to the
    /// provider's 40-character limit when over-long
    pub receipt: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order: ProviderOrder,
    pub payment: PaymentResponse,
    pub course: CourseResponse,
}

/// Payment callback fields as posted by the checkout client. Field names
/// follow the provider's wire contract.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentResponse {
    /// "ok" on success; signature mismatches are reported through the error
    /// path as `verification_failed`
    pub status: String,
    pub message: String,
    pub payment: PaymentResponse,
    /// The purchased course; absent if it was deleted since checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusResponse {
    /// Payment status, or "no_payment_found" when no checkout exists
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: Currency,
    pub receipt: String,
    pub status: PaymentStatus,
    pub payment_id: String,
    pub razorpay_order_id: Option<String>,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentDBResponse> for PaymentResponse {
    fn from(db: PaymentDBResponse) -> Self {
        Self {
            id: db.id,
            amount: db.amount,
            currency: db.currency,
            receipt: db.receipt,
            status: db.status,
            payment_id: db.payment_id,
            razorpay_order_id: db.razorpay_order_id,
            user_id: db.user_id,
            course_id: db.course_id,
            payment_method: db.payment_method,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
