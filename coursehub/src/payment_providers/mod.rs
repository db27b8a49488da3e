//! Payment provider abstraction layer.
//!
//! This module defines the `PaymentProvider` trait which abstracts the remote
//! checkout provider (Razorpay in production, a dummy provider for tests).
//! The provider instance is constructed once from configuration and injected
//! into [`crate::AppState`]; handlers never reach for a global client.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::PaymentConfig;
use crate::db::models::payments::Currency;

pub mod dummy;
pub mod razorpay;

/// Provider-imposed maximum receipt length.
pub const RECEIPT_MAX_LEN: usize = 40;

/// Create a payment provider from configuration
///
/// This is the single point where we convert config into provider instances.
/// Adding a new provider requires adding a match arm here.
pub fn create_provider(config: &PaymentConfig) -> Result<Arc<dyn PaymentProvider>> {
    match config {
        PaymentConfig::Razorpay(razorpay_config) => Ok(Arc::new(razorpay::RazorpayProvider::new(razorpay_config)?)),
        PaymentConfig::Dummy(dummy_config) => Ok(Arc::new(dummy::DummyProvider::new(dummy_config.secret.clone()))),
    }
}

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur during payment processing
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Payment provider call timed out: {0}")]
    Timeout(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),
}

impl From<PaymentError> for crate::errors::Error {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidData(message) => crate::errors::Error::BadRequest { message },
            // Provider failures and timeouts are retryable internal errors;
            // details go to the log, not the client.
            PaymentError::ProviderApi(detail) => crate::errors::Error::Internal {
                operation: format!("create provider order: {detail}"),
            },
            PaymentError::Timeout(detail) => crate::errors::Error::Internal {
                operation: format!("call payment provider: {detail}"),
            },
        }
    }
}

/// An order registered with the remote provider, identifying a checkout
/// session on their side.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderOrder {
    /// Opaque provider-side order id
    pub id: String,
    /// Amount in minor currency units (paise, cents)
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

/// Request to create a provider order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Amount in minor currency units (paise, cents)
    pub amount: i64,
    pub currency: Currency,
    pub receipt: String,
    pub notes: Option<String>,
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Register an order with the provider, opening a checkout session.
    ///
    /// Implementations must bound the remote call with a timeout and surface
    /// it as [`PaymentError::Timeout`], never hang.
    async fn create_order(&self, request: &OrderRequest) -> Result<ProviderOrder>;

    /// Verify a payment callback signature.
    ///
    /// Fails closed: any mismatch or malformed input returns `false`,
    /// never panics, never returns `true` on uncertainty.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    /// Tag recorded on Payment rows created through this provider.
    fn payment_method(&self) -> &'static str;
}

/// Convert a decimal major-unit amount to provider minor units (x100).
///
/// Rejects negative amounts and amounts with sub-minor-unit precision.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    if amount < Decimal::ZERO {
        return Err(PaymentError::InvalidData("amount must not be negative".to_string()));
    }
    let minor = amount * Decimal::from(100);
    if minor.fract() != Decimal::ZERO {
        return Err(PaymentError::InvalidData(
            "amount has more precision than the currency's minor unit".to_string(),
        ));
    }
    minor
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidData("amount out of range".to_string()))
}

/// Normalize a client-supplied receipt to the provider's 40-character limit.
///
/// A missing receipt is synthesized from the current time; an over-long one
/// is truncated to exactly [`RECEIPT_MAX_LEN`] characters.
pub fn normalize_receipt(receipt: Option<&str>) -> String {
    match receipt {
        Some(r) if r.chars().count() > RECEIPT_MAX_LEN => r.chars().take(RECEIPT_MAX_LEN).collect(),
        Some(r) if !r.is_empty() => r.to_string(),
        _ => format!("receipt_{}", Utc::now().timestamp_millis()),
    }
}
