//! Dummy payment provider implementation.
//!
//! Registers orders in-process without any external call, and verifies
//! callback signatures with the same HMAC scheme as the real provider so
//! tests can drive the full verify flow with validly-signed payloads.

use async_trait::async_trait;
use uuid::Uuid;

use crate::payment_providers::razorpay::{sign_order, verify_order_signature};
use crate::payment_providers::{OrderRequest, PaymentProvider, ProviderOrder, Result};

pub struct DummyProvider {
    secret: String,
}

impl DummyProvider {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Produce a valid callback signature for an (order, payment) pair.
    /// Test-side counterpart of `verify_signature`.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        sign_order(order_id, payment_id, &self.secret)
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn create_order(&self, request: &OrderRequest) -> Result<ProviderOrder> {
        let order_id = format!("order_test_{}", Uuid::new_v4().simple());

        tracing::info!(order_id = %order_id, "Dummy provider created order");

        Ok(ProviderOrder {
            id: order_id,
            amount: request.amount,
            currency: request.currency.to_string(),
            receipt: Some(request.receipt.clone()),
            status: "created".to_string(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_order_signature(order_id, payment_id, signature, &self.secret)
    }

    fn payment_method(&self) -> &'static str {
        "dummy"
    }
}
