//! Test utilities shared by repository and end-to-end tests.

use axum_test::TestServer;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::{Config, DummyConfig, PaymentConfig},
    db::{
        handlers::{Courses, Repository, Users},
        models::{
            courses::{CourseCreateDBRequest, CourseDBResponse},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    payment_providers::dummy::DummyProvider,
};

/// Shared signing secret for the dummy provider in tests.
pub const TEST_PAYMENT_SECRET: &str = "test-payment-secret";

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        payment: Some(PaymentConfig::Dummy(DummyConfig {
            secret: TEST_PAYMENT_SECRET.to_string(),
        })),
        ..Default::default()
    }
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let config = create_test_config();

    let app = crate::Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

/// Produce a validly-signed callback payload for the dummy provider.
pub fn sign_test_callback(order_id: &str, payment_id: &str) -> String {
    DummyProvider::new(TEST_PAYMENT_SECRET.to_string()).sign(order_id, payment_id)
}

async fn create_account(pool: &PgPool, is_admin: bool) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);

    let tag = Uuid::new_v4().simple().to_string();
    let username = if is_admin {
        format!("testadmin_{tag}")
    } else {
        format!("testuser_{tag}")
    };

    users_repo
        .create(&UserCreateDBRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$test-only-placeholder".to_string(),
            first_name: "Test".to_string(),
            last_name: Some("User".to_string()),
            is_admin,
        })
        .await
        .expect("Failed to create test account")
}

pub async fn create_test_user(pool: &PgPool) -> UserDBResponse {
    create_account(pool, false).await
}

pub async fn create_test_admin(pool: &PgPool) -> UserDBResponse {
    create_account(pool, true).await
}

pub async fn create_test_course(pool: &PgPool, creator_id: Uuid) -> CourseDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut courses_repo = Courses::new(&mut conn);

    courses_repo
        .create(&CourseCreateDBRequest {
            title: format!("Test Course {}", Uuid::new_v4().simple()),
            description: "A course used in tests".to_string(),
            price: Decimal::new(2000, 2),
            image_url: "https://img.example.com/course.png".to_string(),
            creator_id,
        })
        .await
        .expect("Failed to create test course")
}
