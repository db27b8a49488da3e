//! OpenAPI documentation configuration.
//!
//! The generated spec is rendered with Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Security scheme for the API (Bearer token).
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token authentication. Obtain a token via `/user/login` and \
                             include it in the `Authorization` header:\n\n\
                             ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "coursehub API",
        description = "Course marketplace backend: catalogue, checkout and entitlements."
    ),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::admin_register,
        api::handlers::auth::admin_login,
        api::handlers::courses::preview_courses,
        api::handlers::courses::list_courses,
        api::handlers::courses::get_course,
        api::handlers::courses::create_course,
        api::handlers::courses::update_course,
        api::handlers::courses::delete_course,
        api::handlers::courses::list_admin_courses,
        api::handlers::payments::create_order,
        api::handlers::payments::verify_payment,
        api::handlers::payments::payment_status,
        api::handlers::entitlements::purchase_course,
        api::handlers::entitlements::revoke_purchased_course,
        api::handlers::entitlements::list_purchased_courses,
    ),
    components(schemas(
        api::models::auth::RegisterRequest,
        api::models::auth::LoginRequest,
        api::models::auth::AuthResponse,
        api::models::users::UserResponse,
        api::models::courses::CourseCreate,
        api::models::courses::CourseUpdate,
        api::models::courses::CourseResponse,
        api::models::courses::CourseListResponse,
        api::models::courses::SingleCourseResponse,
        api::models::payments::CreateOrderRequest,
        api::models::payments::CreateOrderResponse,
        api::models::payments::VerifyPaymentRequest,
        api::models::payments::VerifyPaymentResponse,
        api::models::payments::PaymentStatusResponse,
        api::models::payments::PaymentResponse,
        api::models::entitlements::PurchaseResponse,
        api::models::entitlements::RevokeResponse,
        api::models::entitlements::PurchasedCoursesResponse,
        api::models::entitlements::UserWithEntitlements,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "authentication", description = "Registration and login"),
        (name = "courses", description = "Course catalogue and admin management"),
        (name = "payments", description = "Checkout: order creation and payment verification"),
        (name = "entitlements", description = "Purchased-course management"),
    )
)]
pub struct ApiDoc;
