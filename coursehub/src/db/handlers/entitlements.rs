//! Database repository for course entitlements.
//!
//! The entitlement set is mutated only through the atomic conditional
//! operations here. Grant and revoke are idempotent at the data level, so
//! duplicate provider callbacks or client retries never produce duplicate
//! entries or spurious errors.

use crate::db::errors::Result;
use crate::types::{CourseId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Entitlements<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Entitlements<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Add a course to the user's purchased set if absent.
    ///
    /// Single atomic store operation, not check-then-append: two concurrent
    /// grants for the same pair insert exactly one row. Returns whether a
    /// row was inserted by this call.
    #[instrument(skip(self, user_id, course_id), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn grant(&mut self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO purchased_courses (user_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a course from the user's purchased set.
    ///
    /// Absent entries are a no-op success. Returns whether a row was removed.
    #[instrument(skip(self, user_id, course_id), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn revoke(&mut self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM purchased_courses WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the user already owns the course.
    #[instrument(skip(self, user_id, course_id), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn contains(&mut self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM purchased_courses WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(exists)
    }

    /// Course ids owned by the user, in purchase order.
    #[instrument(skip(self, user_id), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn course_ids(&mut self, user_id: UserId) -> Result<Vec<CourseId>> {
        let ids: Vec<CourseId> = sqlx::query_scalar(
            "SELECT course_id FROM purchased_courses WHERE user_id = $1 ORDER BY purchased_at, course_id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_grant_is_idempotent(pool: PgPool) {
        let user = create_test_user(&pool).await;
        let course_id = Uuid::new_v4();

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Entitlements::new(&mut conn);

        assert!(repo.grant(user.id, course_id).await.unwrap());
        // Second grant inserts nothing and is not an error
        assert!(!repo.grant(user.id, course_id).await.unwrap());

        let ids = repo.course_ids(user.id).await.unwrap();
        assert_eq!(ids, vec![course_id], "course must appear exactly once");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_revoke_is_idempotent(pool: PgPool) {
        let user = create_test_user(&pool).await;
        let course_id = Uuid::new_v4();

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Entitlements::new(&mut conn);

        // Revoking a course that was never purchased is a no-op success
        assert!(!repo.revoke(user.id, course_id).await.unwrap());

        repo.grant(user.id, course_id).await.unwrap();
        assert!(repo.revoke(user.id, course_id).await.unwrap());
        assert!(!repo.revoke(user.id, course_id).await.unwrap());
        assert!(!repo.contains(user.id, course_id).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_course_ids_in_purchase_order(pool: PgPool) {
        let user = create_test_user(&pool).await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Entitlements::new(&mut conn);

        repo.grant(user.id, first).await.unwrap();
        repo.grant(user.id, second).await.unwrap();

        let ids = repo.course_ids(user.id).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(repo.contains(user.id, first).await.unwrap());
        assert!(repo.contains(user.id, second).await.unwrap());
    }
}
