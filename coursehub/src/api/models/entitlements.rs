//! API request/response models for entitlement operations.

use super::{courses::CourseResponse, users::UserResponse};
use crate::types::CourseId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseResponse {
    pub msg: String,
    #[serde(rename = "purchasedCourse")]
    pub purchased_course: CourseResponse,
}

/// The user together with their current entitlement set, returned after a
/// revoke so the client can refresh its view in one round trip.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserWithEntitlements {
    #[serde(flatten)]
    pub user: UserResponse,
    #[serde(rename = "purchasedCourses")]
    #[schema(value_type = Vec<String>)]
    pub purchased_courses: Vec<CourseId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevokeResponse {
    pub msg: String,
    #[serde(rename = "updatedUser")]
    pub updated_user: UserWithEntitlements,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchasedCoursesResponse {
    pub msg: String,
    #[serde(rename = "purchasedCourses")]
    pub purchased_courses: Vec<CourseResponse>,
}
