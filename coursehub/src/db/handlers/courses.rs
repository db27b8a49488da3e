//! Database repository for catalogue courses.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::courses::{CourseCreateDBRequest, CourseDBResponse, CourseUpdateDBRequest},
};
use crate::types::{CourseId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing courses
#[derive(Debug, Clone)]
pub struct CourseFilter {
    pub skip: i64,
    pub limit: i64,
}

impl CourseFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

impl Default for CourseFilter {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

pub struct Courses<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Courses<'c> {
    type CreateRequest = CourseCreateDBRequest;
    type UpdateRequest = CourseUpdateDBRequest;
    type Response = CourseDBResponse;
    type Id = CourseId;
    type Filter = CourseFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let course_id = Uuid::new_v4();

        let course = sqlx::query_as::<_, CourseDBResponse>(
            r#"
            INSERT INTO courses (id, title, description, price, image_url, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.image_url)
        .bind(request.creator_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(course)
    }

    #[instrument(skip(self), fields(course_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let course = sqlx::query_as::<_, CourseDBResponse>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(course)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let courses = sqlx::query_as::<_, CourseDBResponse>("SELECT * FROM courses WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(courses.into_iter().map(|course| (course.id, course)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let courses = sqlx::query_as::<_, CourseDBResponse>(
            "SELECT * FROM courses ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(courses)
    }

    #[instrument(skip(self), fields(course_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(course_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let course = sqlx::query_as::<_, CourseDBResponse>(
            r#"
            UPDATE courses SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                image_url = COALESCE($5, image_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.image_url)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(course)
    }
}

impl<'c> Courses<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// List courses created by a specific admin
    #[instrument(skip(self, creator_id), fields(creator_id = %abbrev_uuid(&creator_id)), err)]
    pub async fn list_by_creator(&mut self, creator_id: UserId) -> Result<Vec<CourseDBResponse>> {
        let courses = sqlx::query_as::<_, CourseDBResponse>(
            "SELECT * FROM courses WHERE creator_id = $1 ORDER BY created_at DESC",
        )
        .bind(creator_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(courses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_admin, create_test_course};
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_course_crud(pool: PgPool) {
        let admin = create_test_admin(&pool).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Courses::new(&mut conn);

        let created = repo
            .create(&CourseCreateDBRequest {
                title: "Intro to Rust".to_string(),
                description: "Ownership, borrowing, fearless concurrency".to_string(),
                price: Decimal::new(2000, 2),
                image_url: "https://img.example.com/rust.png".to_string(),
                creator_id: admin.id,
            })
            .await
            .unwrap();
        assert_eq!(created.title, "Intro to Rust");
        assert_eq!(created.price, Decimal::new(2000, 2));

        let updated = repo
            .update(
                created.id,
                &CourseUpdateDBRequest {
                    price: Some(Decimal::new(2500, 2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Decimal::new(2500, 2));
        // Untouched fields survive the partial update
        assert_eq!(updated.title, "Intro to Rust");

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_course_is_not_found(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Courses::new(&mut conn);

        let err = repo
            .update(Uuid::new_v4(), &CourseUpdateDBRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_bulk_skips_missing_ids(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let course_a = create_test_course(&pool, admin.id).await;
        let course_b = create_test_course(&pool, admin.id).await;
        let missing = Uuid::new_v4();

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Courses::new(&mut conn);

        let found = repo.get_bulk(vec![course_a.id, course_b.id, missing]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains_key(&course_a.id));
        assert!(found.contains_key(&course_b.id));
        assert!(!found.contains_key(&missing));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_by_creator(pool: PgPool) {
        let admin_a = create_test_admin(&pool).await;
        let admin_b = create_test_admin(&pool).await;
        create_test_course(&pool, admin_a.id).await;
        create_test_course(&pool, admin_a.id).await;
        create_test_course(&pool, admin_b.id).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Courses::new(&mut conn);

        assert_eq!(repo.list_by_creator(admin_a.id).await.unwrap().len(), 2);
        assert_eq!(repo.list_by_creator(admin_b.id).await.unwrap().len(), 1);
    }
}
