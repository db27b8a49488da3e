//! HTTP handlers for the checkout flow: order creation, payment
//! verification, and payment-status lookup.
//!
//! Side-effect ordering in the verifier is strict: the signature must verify
//! before any store mutation, and the payment status transition commits
//! atomically with the entitlement grant. Both store mutations use atomic
//! conditional operations, so duplicate callbacks (client retries, provider
//! redelivery) converge on the same end state.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    api::models::{
        courses::CourseResponse,
        payments::{
            CreateOrderRequest, CreateOrderResponse, PaymentResponse, PaymentStatusResponse, VerifyPaymentRequest,
            VerifyPaymentResponse,
        },
        users::CurrentUser,
    },
    db::{
        handlers::{Courses, Entitlements, Payments, Repository, payments::CompletionOutcome},
        models::payments::{Currency, PaymentCreateDBRequest},
    },
    errors::{Error, Result},
    payment_providers::{self, OrderRequest, PaymentProvider},
    types::CourseId,
};

/// Resolve the configured provider, or answer 501 if payments are not set up.
fn provider(state: &AppState) -> std::result::Result<&dyn PaymentProvider, Response> {
    match state.payments.as_deref() {
        Some(provider) => Ok(provider),
        None => {
            tracing::warn!("Checkout requested but no payment provider is configured");
            let body = Json(json!({
                "error": "No payment provider configured",
                "message": "Sorry, there's no payment provider setup. Please contact support."
            }));
            Err((StatusCode::NOT_IMPLEMENTED, body).into_response())
        }
    }
}

/// Create a provider order and a pending payment record
#[utoipa::path(
    post,
    path = "/razorpay/create-order",
    tag = "payments",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order registered with the provider", body = CreateOrderResponse),
        (status = 400, description = "Invalid amount"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Course already owned"),
        (status = 500, description = "Provider or store failure"),
        (status = 501, description = "No payment provider configured"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(course_id = %request.course_id))]
pub async fn create_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateOrderRequest>,
) -> std::result::Result<Response, Error> {
    let provider = match provider(&state) {
        Ok(provider) => provider,
        Err(response) => return Ok(response),
    };

    if request.amount <= rust_decimal::Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Amount must be greater than zero".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Validate the course exists
    let mut courses = Courses::new(&mut pool_conn);
    let course = courses.get_by_id(request.course_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Course".to_string(),
        id: request.course_id.to_string(),
    })?;

    // An owned course must be rejected before any provider call; no Payment
    // row is created on this path.
    let mut entitlements = Entitlements::new(&mut pool_conn);
    if entitlements.contains(user.id, request.course_id).await? {
        return Err(Error::Conflict {
            message: "already own this course".to_string(),
        });
    }

    let currency = request.currency.unwrap_or(Currency::Inr);
    let receipt = payment_providers::normalize_receipt(request.receipt.as_deref());
    let amount_minor = payment_providers::to_minor_units(request.amount)?;

    // Remote order first; nothing is persisted if the provider call fails
    let order = provider
        .create_order(&OrderRequest {
            amount: amount_minor,
            currency,
            receipt: receipt.clone(),
            notes: request.notes.clone(),
        })
        .await?;

    let mut payments = Payments::new(&mut pool_conn);
    let payment = payments
        .create(&PaymentCreateDBRequest {
            amount: request.amount,
            currency,
            receipt,
            // The provider payment id is unknown until verification, so the
            // order id stands in for it
            payment_id: order.id.clone(),
            razorpay_order_id: order.id.clone(),
            user_id: user.id,
            course_id: request.course_id,
            payment_method: provider.payment_method().to_string(),
            notes: request.notes,
        })
        .await
        .map_err(|e| {
            // The remote order cannot be deleted; it stays unpaid and
            // harmless, but leave its id in the log for reconciliation.
            tracing::error!(order_id = %order.id, "Provider order created but payment record failed: {e}");
            e
        })?;

    Ok(Json(CreateOrderResponse {
        order,
        payment: PaymentResponse::from(payment),
        course: CourseResponse::from(course),
    })
    .into_response())
}

/// Verify a payment callback and grant the entitlement exactly once
#[utoipa::path(
    post,
    path = "/razorpay/verify-payment",
    tag = "payments",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified and course granted", body = VerifyPaymentResponse),
        (status = 400, description = "Signature verification failed (`status: verification_failed`)"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Payment record not found"),
        (status = 409, description = "Payment is in a terminal failed/refunded state"),
        (status = 501, description = "No payment provider configured"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %request.razorpay_order_id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<VerifyPaymentRequest>,
) -> std::result::Result<Response, Error> {
    let provider = match provider(&state) {
        Ok(provider) => provider,
        Err(response) => return Ok(response),
    };

    // Authenticity first: no store mutation happens before this passes
    if !provider.verify_signature(&request.razorpay_order_id, &request.razorpay_payment_id, &request.razorpay_signature) {
        return Err(Error::VerificationFailed);
    }

    // Status transition and entitlement grant commit together; a duplicate
    // callback re-driving this block converges on the same end state.
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut payments = Payments::new(&mut tx);
    let outcome = payments
        .complete_by_order_id(&request.razorpay_order_id, &request.razorpay_payment_id)
        .await?;

    let payment = match outcome {
        CompletionOutcome::Completed(payment) | CompletionOutcome::AlreadyCompleted(payment) => payment,
        CompletionOutcome::NotFound => {
            return Err(Error::NotFound {
                resource: "Payment record".to_string(),
                id: request.razorpay_order_id,
            });
        }
        CompletionOutcome::InvalidTransition(payment) => {
            return Err(Error::Conflict {
                message: format!("payment is {} and cannot be completed", payment.status),
            });
        }
    };

    let mut entitlements = Entitlements::new(&mut tx);
    let granted = entitlements.grant(payment.user_id, payment.course_id).await?;
    if !granted {
        tracing::debug!(
            user_id = %payment.user_id,
            course_id = %payment.course_id,
            "Entitlement already present, grant skipped"
        );
    }

    let mut courses = Courses::new(&mut tx);
    let course = courses.get_by_id(payment.course_id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(payment_id = %payment.payment_id, "Payment verification successful");

    Ok(Json(VerifyPaymentResponse {
        status: "ok".to_string(),
        message: "Payment verified successfully and course added to purchased courses".to_string(),
        payment: PaymentResponse::from(payment),
        course: course.map(CourseResponse::from),
    })
    .into_response())
}

/// Look up the payment status for a course
#[utoipa::path(
    get,
    path = "/razorpay/payment-status/{course_id}",
    tag = "payments",
    params(("course_id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Payment status, or `no_payment_found`", body = PaymentStatusResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(course_id = %course_id))]
pub async fn payment_status(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<PaymentStatusResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut payments = Payments::new(&mut pool_conn);

    let payment = payments.latest_for_user_course(user.id, course_id).await?;

    Ok(Json(match payment {
        Some(payment) => PaymentStatusResponse {
            status: payment.status.to_string(),
            payment: Some(PaymentResponse::from(payment)),
        },
        None => PaymentStatusResponse {
            status: "no_payment_found".to_string(),
            payment: None,
        },
    }))
}
