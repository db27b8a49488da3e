//! HTTP handlers for the course catalogue.
//!
//! The public preview and the authenticated browse endpoints read the same
//! catalogue; admin endpoints manage courses owned by the calling admin.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::models::{
        courses::{CourseCreate, CourseListResponse, CourseResponse, CourseUpdate, ListCoursesQuery, SingleCourseResponse},
        users::CurrentUser,
    },
    auth::require_admin,
    db::{
        handlers::{Courses, Repository},
        models::courses::{CourseCreateDBRequest, CourseUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{CourseId, Operation},
};

fn course_not_found(id: CourseId) -> Error {
    Error::NotFound {
        resource: "Course".to_string(),
        id: id.to_string(),
    }
}

/// Public course catalogue, no authentication required
#[utoipa::path(
    get,
    path = "/courses/preview",
    tag = "courses",
    params(ListCoursesQuery),
    responses(
        (status = 200, description = "All courses available on the platform", body = CourseListResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn preview_courses(State(state): State<AppState>, Query(query): Query<ListCoursesQuery>) -> Result<Json<CourseListResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Courses::new(&mut pool_conn);

    let courses = repo
        .list(&crate::db::handlers::courses::CourseFilter::new(
            query.pagination.skip(),
            query.pagination.limit(),
        ))
        .await?;

    Ok(Json(CourseListResponse {
        msg: "all courses available for user".to_string(),
        courses: courses.into_iter().map(CourseResponse::from).collect(),
    }))
}

/// Course catalogue for authenticated users
#[utoipa::path(
    get,
    path = "/user/courses",
    tag = "courses",
    params(ListCoursesQuery),
    responses(
        (status = 200, description = "All courses available", body = CourseListResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<ListCoursesQuery>,
    _user: CurrentUser,
) -> Result<Json<CourseListResponse>> {
    preview_courses(State(state), Query(query)).await
}

/// Get a single course by id
#[utoipa::path(
    get,
    path = "/user/course/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "The course", body = SingleCourseResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    _user: CurrentUser,
) -> Result<Json<SingleCourseResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Courses::new(&mut pool_conn);

    let course = repo.get_by_id(course_id).await?.ok_or_else(|| course_not_found(course_id))?;

    Ok(Json(SingleCourseResponse {
        msg: "searched course".to_string(),
        course: CourseResponse::from(course),
    }))
}

fn validate_course_fields(title: &str, description: &str, price: Decimal, image: &str) -> Result<()> {
    if title.trim().is_empty() || description.trim().is_empty() || image.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "all fields are required".to_string(),
        });
    }
    if price < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "price must be a valid positive number".to_string(),
        });
    }
    if !image.starts_with("http") {
        return Err(Error::BadRequest {
            message: "image must be a valid URL".to_string(),
        });
    }
    Ok(())
}

/// Create a course (admin only)
#[utoipa::path(
    post,
    path = "/admin/course",
    tag = "courses",
    request_body = CourseCreate,
    responses(
        (status = 201, description = "Course created", body = SingleCourseResponse),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an admin"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CourseCreate>,
) -> Result<(StatusCode, Json<SingleCourseResponse>)> {
    require_admin(&user, Operation::Create, "courses")?;
    validate_course_fields(&request.title, &request.description, request.price, &request.image)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Courses::new(&mut pool_conn);

    let course = repo
        .create(&CourseCreateDBRequest {
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            price: request.price,
            image_url: request.image.trim().to_string(),
            creator_id: user.id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SingleCourseResponse {
            msg: "course created successfully".to_string(),
            course: CourseResponse::from(course),
        }),
    ))
}

/// Update a course owned by the calling admin
#[utoipa::path(
    put,
    path = "/admin/course/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    request_body = CourseUpdate,
    responses(
        (status = 200, description = "Course updated", body = SingleCourseResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an admin or not the course owner"),
        (status = 404, description = "Course not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_course(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
    Json(request): Json<CourseUpdate>,
) -> Result<Json<SingleCourseResponse>> {
    require_admin(&user, Operation::Update, "courses")?;

    if let Some(price) = request.price {
        if price < Decimal::ZERO {
            return Err(Error::BadRequest {
                message: "price must be a valid positive number".to_string(),
            });
        }
    }
    if let Some(image) = &request.image {
        if !image.starts_with("http") {
            return Err(Error::BadRequest {
                message: "image must be a valid URL".to_string(),
            });
        }
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Courses::new(&mut tx);

    let existing = repo.get_by_id(course_id).await?.ok_or_else(|| course_not_found(course_id))?;
    if existing.creator_id != user.id {
        return Err(Error::InsufficientPermissions {
            action: Operation::Update,
            resource: "courses created by another admin".to_string(),
        });
    }

    let course = repo
        .update(
            course_id,
            &CourseUpdateDBRequest {
                title: request.title,
                description: request.description,
                price: request.price,
                image_url: request.image,
            },
        )
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(SingleCourseResponse {
        msg: "course updated successfully".to_string(),
        course: CourseResponse::from(course),
    }))
}

/// Delete a course owned by the calling admin
#[utoipa::path(
    delete,
    path = "/admin/course/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an admin or not the course owner"),
        (status = 404, description = "Course not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>> {
    require_admin(&user, Operation::Delete, "courses")?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Courses::new(&mut tx);

    let existing = repo.get_by_id(course_id).await?.ok_or_else(|| course_not_found(course_id))?;
    if existing.creator_id != user.id {
        return Err(Error::InsufficientPermissions {
            action: Operation::Delete,
            resource: "courses created by another admin".to_string(),
        });
    }

    repo.delete(course_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(serde_json::json!({ "msg": "course deleted successfully" })))
}

/// List courses created by the calling admin
#[utoipa::path(
    get,
    path = "/admin/course",
    tag = "courses",
    responses(
        (status = 200, description = "Courses created by this admin", body = CourseListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an admin"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_admin_courses(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CourseListResponse>> {
    require_admin(&user, Operation::Read, "courses")?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Courses::new(&mut pool_conn);

    let courses = repo.list_by_creator(user.id).await?;

    Ok(Json(CourseListResponse {
        msg: "courses created by admin".to_string(),
        courses: courses.into_iter().map(CourseResponse::from).collect(),
    }))
}
