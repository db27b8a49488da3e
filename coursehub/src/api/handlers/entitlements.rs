//! HTTP handlers for entitlement operations: the direct purchase path,
//! revocation, and the purchased-courses listing.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    api::models::{
        courses::CourseResponse,
        entitlements::{PurchaseResponse, PurchasedCoursesResponse, RevokeResponse, UserWithEntitlements},
        users::{CurrentUser, UserResponse},
    },
    db::handlers::{Courses, Entitlements, Repository, Users},
    errors::{Error, Result},
    types::CourseId,
};

/// Directly grant a course to the calling user, without payment
/// verification.
///
/// Inherited from the source application; any authenticated user can
/// acquire any course for free through this route. Gate or remove it
/// before charging real money.
#[utoipa::path(
    post,
    path = "/user/purchase/{id}",
    tag = "entitlements",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course granted", body = PurchaseResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Course already owned"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(course_id = %course_id))]
pub async fn purchase_course(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<PurchaseResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut courses = Courses::new(&mut pool_conn);
    let course = courses.get_by_id(course_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Course".to_string(),
        id: course_id.to_string(),
    })?;

    // Atomic add-if-absent; a false return means the course was already owned
    let mut entitlements = Entitlements::new(&mut pool_conn);
    if !entitlements.grant(user.id, course_id).await? {
        return Err(Error::Conflict {
            message: "You cannot buy the same course twice. You already own this course.".to_string(),
        });
    }

    Ok(Json(PurchaseResponse {
        msg: "course purchased successfully".to_string(),
        purchased_course: CourseResponse::from(course),
    }))
}

/// Remove a course from the calling user's purchased set
#[utoipa::path(
    delete,
    path = "/user/purchasedCourse/{id}",
    tag = "entitlements",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course removed (no-op if it was never owned)", body = RevokeResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(course_id = %course_id))]
pub async fn revoke_purchased_course(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<RevokeResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Idempotent: revoking an absent entry is a success, not an error
    let mut entitlements = Entitlements::new(&mut pool_conn);
    entitlements.revoke(user.id, course_id).await?;
    let remaining = entitlements.course_ids(user.id).await?;

    let mut users = Users::new(&mut pool_conn);
    let db_user = users.get_by_id(user.id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user.id.to_string(),
    })?;

    Ok(Json(RevokeResponse {
        msg: "course removed from purchased courses successfully".to_string(),
        updated_user: UserWithEntitlements {
            user: UserResponse::from(db_user),
            purchased_courses: remaining,
        },
    }))
}

/// List the calling user's purchased courses, resolved to course records
#[utoipa::path(
    get,
    path = "/user/purchasedCourses",
    tag = "entitlements",
    responses(
        (status = 200, description = "Purchased courses", body = PurchasedCoursesResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_purchased_courses(State(state): State<AppState>, user: CurrentUser) -> Result<Json<PurchasedCoursesResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut entitlements = Entitlements::new(&mut pool_conn);
    let course_ids = entitlements.course_ids(user.id).await?;

    if course_ids.is_empty() {
        return Ok(Json(PurchasedCoursesResponse {
            msg: "no purchased courses found".to_string(),
            purchased_courses: vec![],
        }));
    }

    let mut courses = Courses::new(&mut pool_conn);
    let mut resolved = courses.get_bulk(course_ids.clone()).await?;

    // Resolve each id in purchase order; ids whose course has been deleted
    // are skipped rather than failing the whole query
    let mut purchased = Vec::with_capacity(course_ids.len());
    for course_id in course_ids {
        match resolved.remove(&course_id) {
            Some(course) => purchased.push(CourseResponse::from(course)),
            None => {
                tracing::warn!(course_id = %course_id, "Purchased course no longer resolves, skipping");
            }
        }
    }

    Ok(Json(PurchasedCoursesResponse {
        msg: "purchased courses found".to_string(),
        purchased_courses: purchased,
    }))
}
