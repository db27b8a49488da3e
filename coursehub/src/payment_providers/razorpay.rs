//! Razorpay payment provider implementation.
//!
//! Orders are registered through the Razorpay Orders REST API
//! (`POST /v1/orders`, HTTP basic auth with the key id/secret, amounts in
//! minor units). Payment callbacks are authenticated with the documented
//! signature scheme: `hex(hmac_sha256(key_secret, order_id + "|" + payment_id))`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use url::Url;

use crate::config::RazorpayConfig;
use crate::payment_providers::{OrderRequest, PaymentError, PaymentProvider, ProviderOrder, Result};

type HmacSha256 = Hmac<Sha256>;

pub struct RazorpayProvider {
    http: reqwest::Client,
    api_url: Url,
    key_id: String,
    key_secret: String,
}

/// Wire shape of an order returned by the Razorpay API.
#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
    receipt: Option<String>,
    status: String,
}

impl RazorpayProvider {
    pub fn new(config: &RazorpayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::ProviderApi(format!("build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    fn orders_url(&self) -> Result<Url> {
        self.api_url
            .join("/v1/orders")
            .map_err(|e| PaymentError::ProviderApi(format!("build orders URL: {e}")))
    }
}

#[async_trait]
impl PaymentProvider for RazorpayProvider {
    async fn create_order(&self, request: &OrderRequest) -> Result<ProviderOrder> {
        let body = json!({
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
            "notes": request.notes.as_deref().map(|n| json!({ "notes": n })).unwrap_or_else(|| json!({})),
        });

        let response = self
            .http
            .post(self.orders_url()?)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::Timeout(e.to_string())
                } else {
                    PaymentError::ProviderApi(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PaymentError::ProviderApi(format!("orders API returned {status}: {detail}")));
        }

        let order: RazorpayOrder = response
            .json()
            .await
            .map_err(|e| PaymentError::ProviderApi(format!("decode orders response: {e}")))?;

        tracing::info!(order_id = %order.id, "Created provider order");

        Ok(ProviderOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt,
            status: order.status,
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_order_signature(order_id, payment_id, signature, &self.key_secret)
    }

    fn payment_method(&self) -> &'static str {
        "razorpay"
    }
}

/// Compute the callback signature for an (order, payment) pair.
pub(crate) fn sign_order(order_id: &str, payment_id: &str, secret: &str) -> String {
    let payload = format!("{order_id}|{payment_id}");

    // HMAC accepts keys of any length, so new_from_slice cannot fail here
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a callback signature against the expected HMAC.
///
/// Fails closed on any malformed input. Comparison is constant-time to
/// prevent timing attacks.
pub(crate) fn verify_order_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    let expected = sign_order(order_id, payment_id, secret);
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::payments::Currency;
    use std::time::Duration;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test_key_secret";

    #[test]
    fn test_sign_and_verify() {
        let signature = sign_order("order_abc", "pay_xyz", SECRET);

        // Hex-encoded SHA-256 HMAC is 64 chars
        assert_eq!(signature.len(), 64);
        assert!(verify_order_signature("order_abc", "pay_xyz", &signature, SECRET));

        // Wrong secret should fail
        assert!(!verify_order_signature("order_abc", "pay_xyz", &signature, "other_secret"));
    }

    #[test]
    fn test_verification_fails_closed_on_any_mutation() {
        let signature = sign_order("order_abc", "pay_xyz", SECRET);

        // Mutate the order id
        assert!(!verify_order_signature("order_abd", "pay_xyz", &signature, SECRET));
        // Mutate the payment id
        assert!(!verify_order_signature("order_abc", "pay_xyy", &signature, SECRET));
        // Mutate one hex digit of the signature
        let mut tampered = signature.clone().into_bytes();
        tampered[0] = if tampered[0] == b'0' { b'1' } else { b'0' };
        assert!(!verify_order_signature(
            "order_abc",
            "pay_xyz",
            std::str::from_utf8(&tampered).unwrap(),
            SECRET
        ));
    }

    #[test]
    fn test_verification_rejects_malformed_signatures() {
        let short = "0".repeat(63);
        let long = "0".repeat(65);
        for bad in ["", "zz", "not-hex-at-all", short.as_str(), long.as_str()] {
            assert!(!verify_order_signature("order_abc", "pay_xyz", bad, SECRET));
        }
    }

    fn test_provider(api_url: &str) -> RazorpayProvider {
        RazorpayProvider::new(&RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SECRET.to_string(),
            api_url: api_url.parse().unwrap(),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_order_sends_minor_units_and_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(basic_auth("rzp_test_key", SECRET))
            .and(body_partial_json(json!({
                "amount": 2000,
                "currency": "INR",
                "receipt": "r1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "order_Mb2jR7HK",
                "amount": 2000,
                "currency": "INR",
                "receipt": "r1",
                "status": "created",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let order = provider
            .create_order(&OrderRequest {
                amount: 2000,
                currency: Currency::Inr,
                receipt: "r1".to_string(),
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(order.id, "order_Mb2jR7HK");
        assert_eq!(order.amount, 2000);
        assert_eq!(order.status, "created");
    }

    #[tokio::test]
    async fn test_create_order_surfaces_api_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": "BAD_REQUEST_ERROR", "description": "Authentication failed" }
            })))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let err = provider
            .create_order(&OrderRequest {
                amount: 100,
                currency: Currency::Inr,
                receipt: "r1".to_string(),
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::ProviderApi(_)));
    }

    #[tokio::test]
    async fn test_create_order_times_out_instead_of_hanging() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "id": "order_slow", "amount": 100, "currency": "INR",
                        "receipt": null, "status": "created",
                    }))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let config = RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SECRET.to_string(),
            api_url: server.uri().parse().unwrap(),
            timeout: Duration::from_millis(200),
        };
        let provider = RazorpayProvider::new(&config).unwrap();

        let err = provider
            .create_order(&OrderRequest {
                amount: 100,
                currency: Currency::Inr,
                receipt: "r1".to_string(),
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Timeout(_)), "expected timeout, got {err:?}");
    }
}
