//! # coursehub: Course Marketplace Backend
//!
//! `coursehub` is the backend of a course marketplace: users browse and
//! purchase courses, admins create and manage them, and a payment gateway
//! integration records purchases. The service exposes a JSON HTTP API and
//! persists everything in PostgreSQL.
//!
//! ## Overview
//!
//! The safety-critical core is the purchase/entitlement flow:
//!
//! 1. **Order creation** (`POST /razorpay/create-order`): validates the
//!    course and ownership, registers an order with the payment provider,
//!    and persists a `pending` payment record keyed by the provider order id.
//! 2. **Payment verification** (`POST /razorpay/verify-payment`):
//!    cryptographically verifies the provider callback, transitions the
//!    payment to `completed`, and grants the course entitlement — exactly
//!    once, even under duplicate callbacks.
//! 3. **Entitlement store**: the durable (user, course) ownership relation,
//!    mutated only through atomic conditional operations.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL (via SQLx) for all persistence.
//! Requests pass through bearer-token authentication, reach a handler in
//! [`api::handlers`], and interact with the database through the repository
//! layer in [`db::handlers`]. The payment provider is an injected
//! [`payment_providers::PaymentProvider`] trait object constructed once from
//! configuration.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use coursehub::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = coursehub::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     coursehub::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod payment_providers;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::payment_providers::PaymentProvider;
use axum::http::HeaderValue;
use axum::{
    Router, http,
    routing::{delete, get, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{CourseId, PaymentId, UserId};

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `db`: PostgreSQL connection pool
/// - `config`: application configuration loaded from file/environment
/// - `payments`: the injected payment provider, absent when payments are not
///   configured (checkout endpoints answer 501 in that case)
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub payments: Option<Arc<dyn PaymentProvider>>,
}

/// Get the coursehub database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    // A wildcard cannot appear inside an origin list; it maps to Any
    let mut cors = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        CorsLayer::new().allow_origin(tower_http::cors::Any)
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        CorsLayer::new().allow_origin(origins)
    };

    cors = cors
        .allow_credentials(cors_config.allow_credentials)
        .allow_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// This wires up:
/// - Authentication routes (user and admin registration/login)
/// - Course catalogue routes (public preview, authed browse, admin CRUD)
/// - Checkout routes (order creation, payment verification, status lookup)
/// - Entitlement routes (direct purchase, revoke, listing)
/// - OpenAPI docs, CORS, and request tracing
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Registration and login
        .route("/user/register", post(api::handlers::auth::register))
        .route("/user/login", post(api::handlers::auth::login))
        .route("/admin/register", post(api::handlers::auth::admin_register))
        .route("/admin/login", post(api::handlers::auth::admin_login))
        // Course catalogue
        .route("/courses/preview", get(api::handlers::courses::preview_courses))
        .route("/user/courses", get(api::handlers::courses::list_courses))
        .route("/user/course/{id}", get(api::handlers::courses::get_course))
        // Admin course management
        .route(
            "/admin/course",
            post(api::handlers::courses::create_course).get(api::handlers::courses::list_admin_courses),
        )
        .route(
            "/admin/course/{id}",
            put(api::handlers::courses::update_course).delete(api::handlers::courses::delete_course),
        )
        // Checkout
        .route("/razorpay/create-order", post(api::handlers::payments::create_order))
        .route("/razorpay/verify-payment", post(api::handlers::payments::verify_payment))
        .route(
            "/razorpay/payment-status/{course_id}",
            get(api::handlers::payments::payment_status),
        )
        // Entitlements
        .route("/user/purchase/{id}", post(api::handlers::entitlements::purchase_course))
        .route(
            "/user/purchasedCourses",
            get(api::handlers::entitlements::list_purchased_courses),
        )
        .route(
            "/user/purchasedCourse/{id}",
            delete(api::handlers::entitlements::revoke_purchased_course),
        );

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(api_routes)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, and constructs the payment provider and router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPool::connect(&config.database_url).await?;
        migrator().run(&pool).await?;

        Self::build(config, pool)
    }

    /// Create an application on an existing pool (migrations assumed applied).
    /// Used by tests, where `#[sqlx::test]` provides a migrated pool.
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        Self::build(config, pool)
    }

    fn build(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        // One provider instance per process, injected through state
        let payments = match &config.payment {
            Some(payment_config) => Some(payment_providers::create_provider(payment_config).map_err(|e| anyhow::anyhow!(e))?),
            None => None,
        };

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .maybe_payments(payments)
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "coursehub listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::test_utils::*;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    async fn register_and_login(server: &TestServer, email: &str, admin: bool) -> String {
        let prefix = if admin { "admin" } else { "user" };

        let register = server
            .post(&format!("/{prefix}/register"))
            .json(&json!({
                "username": email.split('@').next().unwrap(),
                "email": email,
                "password": "correct-horse-battery",
                "firstName": "Test",
            }))
            .await;
        register.assert_status(axum::http::StatusCode::CREATED);

        let login = server
            .post(&format!("/{prefix}/login"))
            .json(&json!({ "email": email, "password": "correct-horse-battery" }))
            .await;
        login.assert_status_ok();
        login.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    async fn create_course_via_api(server: &TestServer, admin_token: &str) -> String {
        let response = server
            .post("/admin/course")
            .authorization_bearer(admin_token)
            .json(&json!({
                "title": "Systems Programming",
                "description": "From registers to runtimes",
                "price": "20",
                "image": "https://img.example.com/sys.png",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["course"]["id"].as_str().unwrap().to_string()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_end_to_end_purchase_flow(pool: PgPool) {
        let server = create_test_app(pool).await;

        let admin_token = register_and_login(&server, "teach@example.com", true).await;
        let course_id = create_course_via_api(&server, &admin_token).await;
        let token = register_and_login(&server, "student@example.com", false).await;

        // Create an order for the $20 course
        let order_response = server
            .post("/razorpay/create-order")
            .authorization_bearer(&token)
            .json(&json!({
                "courseId": course_id,
                "amount": "20",
                "currency": "USD",
                "receipt": "r1",
            }))
            .await;
        order_response.assert_status_ok();
        let order_body = order_response.json::<Value>();
        let order_id = order_body["order"]["id"].as_str().unwrap().to_string();
        assert_eq!(order_body["order"]["amount"], 2000, "amount must be in minor units");
        assert_eq!(order_body["payment"]["status"], "pending");
        assert_eq!(order_body["payment"]["receipt"], "r1");
        assert_eq!(order_body["course"]["id"].as_str().unwrap(), course_id);

        // Payment status reflects the pending checkout
        let status = server
            .get(&format!("/razorpay/payment-status/{course_id}"))
            .authorization_bearer(&token)
            .await;
        status.assert_status_ok();
        assert_eq!(status.json::<Value>()["status"], "pending");

        // Verify with a validly-signed callback
        let payment_id = "pay_e2e_1";
        let signature = sign_test_callback(&order_id, payment_id);
        let verify = server
            .post("/razorpay/verify-payment")
            .authorization_bearer(&token)
            .json(&json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": payment_id,
                "razorpay_signature": signature,
            }))
            .await;
        verify.assert_status_ok();
        let verify_body = verify.json::<Value>();
        assert_eq!(verify_body["status"], "ok");
        assert_eq!(verify_body["payment"]["status"], "completed");
        assert_eq!(verify_body["payment"]["payment_id"], payment_id);

        // The course is listed exactly once
        let purchased = server.get("/user/purchasedCourses").authorization_bearer(&token).await;
        purchased.assert_status_ok();
        let courses = purchased.json::<Value>()["purchasedCourses"].as_array().unwrap().clone();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0]["id"].as_str().unwrap(), course_id);

        // Re-driving verify with identical inputs is benign and does not
        // duplicate the entitlement
        let verify_again = server
            .post("/razorpay/verify-payment")
            .authorization_bearer(&token)
            .json(&json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": payment_id,
                "razorpay_signature": sign_test_callback(&order_id, payment_id),
            }))
            .await;
        verify_again.assert_status_ok();
        assert_eq!(verify_again.json::<Value>()["status"], "ok");

        let purchased = server.get("/user/purchasedCourses").authorization_bearer(&token).await;
        assert_eq!(purchased.json::<Value>()["purchasedCourses"].as_array().unwrap().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_verify_grants_exactly_once(pool: PgPool) {
        let server = create_test_app(pool).await;

        let admin_token = register_and_login(&server, "teach5@example.com", true).await;
        let course_id = create_course_via_api(&server, &admin_token).await;
        let token = register_and_login(&server, "racer@example.com", false).await;

        let order = server
            .post("/razorpay/create-order")
            .authorization_bearer(&token)
            .json(&json!({ "courseId": course_id, "amount": "20", "receipt": "race-1" }))
            .await;
        let order_id = order.json::<Value>()["order"]["id"].as_str().unwrap().to_string();

        // A provider retry: two verify callbacks with identical valid inputs
        // land at the same time
        let payload = json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": "pay_race",
            "razorpay_signature": sign_test_callback(&order_id, "pay_race"),
        });
        let (first, second) = tokio::join!(
            server.post("/razorpay/verify-payment").authorization_bearer(&token).json(&payload),
            server.post("/razorpay/verify-payment").authorization_bearer(&token).json(&payload),
        );
        first.assert_status_ok();
        second.assert_status_ok();

        // Exactly one entitlement entry, and the payment stayed completed
        let purchased = server.get("/user/purchasedCourses").authorization_bearer(&token).await;
        assert_eq!(purchased.json::<Value>()["purchasedCourses"].as_array().unwrap().len(), 1);

        let status = server
            .get(&format!("/razorpay/payment-status/{course_id}"))
            .authorization_bearer(&token)
            .await;
        let status_body = status.json::<Value>();
        assert_eq!(status_body["status"], "completed");
        assert_eq!(status_body["payment"]["payment_id"], "pay_race");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_order_conflict_when_already_owned(pool: PgPool) {
        let server = create_test_app(pool).await;

        let admin_token = register_and_login(&server, "teach2@example.com", true).await;
        let course_id = create_course_via_api(&server, &admin_token).await;
        let token = register_and_login(&server, "owner@example.com", false).await;

        // Acquire the course through the direct purchase path
        let purchase = server
            .post(&format!("/user/purchase/{course_id}"))
            .authorization_bearer(&token)
            .await;
        purchase.assert_status_ok();

        // A checkout for an owned course is rejected...
        let order = server
            .post("/razorpay/create-order")
            .authorization_bearer(&token)
            .json(&json!({ "courseId": course_id, "amount": "20" }))
            .await;
        order.assert_status(axum::http::StatusCode::CONFLICT);

        // ...and no Payment row was created as a side effect
        let status = server
            .get(&format!("/razorpay/payment-status/{course_id}"))
            .authorization_bearer(&token)
            .await;
        assert_eq!(status.json::<Value>()["status"], "no_payment_found");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_verify_rejects_tampered_signature(pool: PgPool) {
        let server = create_test_app(pool).await;

        let admin_token = register_and_login(&server, "teach3@example.com", true).await;
        let course_id = create_course_via_api(&server, &admin_token).await;
        let token = register_and_login(&server, "victim@example.com", false).await;

        let order = server
            .post("/razorpay/create-order")
            .authorization_bearer(&token)
            .json(&json!({ "courseId": course_id, "amount": "20" }))
            .await;
        let order_id = order.json::<Value>()["order"]["id"].as_str().unwrap().to_string();

        // Signature computed for a different payment id
        let forged = sign_test_callback(&order_id, "pay_other");
        let verify = server
            .post("/razorpay/verify-payment")
            .authorization_bearer(&token)
            .json(&json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_real",
                "razorpay_signature": forged,
            }))
            .await;
        verify.assert_status(axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(verify.json::<Value>()["status"], "verification_failed");

        // No state was mutated
        let purchased = server.get("/user/purchasedCourses").authorization_bearer(&token).await;
        assert!(purchased.json::<Value>()["purchasedCourses"].as_array().unwrap().is_empty());
        let status = server
            .get(&format!("/razorpay/payment-status/{course_id}"))
            .authorization_bearer(&token)
            .await;
        assert_eq!(status.json::<Value>()["status"], "pending");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_verify_unknown_order_is_not_found(pool: PgPool) {
        let server = create_test_app(pool).await;
        let token = register_and_login(&server, "lost@example.com", false).await;

        let signature = sign_test_callback("order_ghost", "pay_ghost");
        let verify = server
            .post("/razorpay/verify-payment")
            .authorization_bearer(&token)
            .json(&json!({
                "razorpay_order_id": "order_ghost",
                "razorpay_payment_id": "pay_ghost",
                "razorpay_signature": signature,
            }))
            .await;
        verify.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_revoke_is_idempotent_over_http(pool: PgPool) {
        let server = create_test_app(pool).await;

        let admin_token = register_and_login(&server, "teach4@example.com", true).await;
        let course_id = create_course_via_api(&server, &admin_token).await;
        let token = register_and_login(&server, "revoker@example.com", false).await;

        server
            .post(&format!("/user/purchase/{course_id}"))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let first = server
            .delete(&format!("/user/purchasedCourse/{course_id}"))
            .authorization_bearer(&token)
            .await;
        first.assert_status_ok();
        assert!(
            first.json::<Value>()["updatedUser"]["purchasedCourses"]
                .as_array()
                .unwrap()
                .is_empty()
        );

        // Second revoke (and revoking a never-owned course) still succeeds
        let second = server
            .delete(&format!("/user/purchasedCourse/{course_id}"))
            .authorization_bearer(&token)
            .await;
        second.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_endpoints_require_authentication(pool: PgPool) {
        let server = create_test_app(pool).await;

        for (method, path) in [
            ("POST", "/razorpay/create-order"),
            ("POST", "/razorpay/verify-payment"),
            ("GET", "/user/purchasedCourses"),
        ] {
            let response = match method {
                "POST" => server.post(path).json(&json!({})).await,
                _ => server.get(path).await,
            };
            response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        }

        // The public preview needs no token
        server.get("/courses/preview").await.assert_status_ok();
    }
}
