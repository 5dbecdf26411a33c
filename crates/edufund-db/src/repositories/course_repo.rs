//! Course repository implementation
//!
//! Provides PostgreSQL-backed storage for the course catalogue.

use super::{is_unique_violation, like_pattern, parse_column};
use edufund_core::{
    models::Course,
    query::CourseQuery,
    traits::{CourseRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument};

const COURSE_COLUMNS: &str = "id, course_code, name, provider, description, fee, \
     start_date, end_date, status, created_at, updated_at";

/// PostgreSQL implementation of CourseRepository
pub struct PgCourseRepository {
    pool: PgPool,
}

impl PgCourseRepository {
    /// Create a new course repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_course_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &CourseQuery) {
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }

    if let Some(provider) = query.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        qb.push(" AND provider ILIKE ").push_bind(like_pattern(provider));
    }

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (course_code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl Repository<Course, i32> for PgCourseRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Course>> {
        debug!("Finding course by id: {}", id);

        let row = sqlx::query_as::<Postgres, CourseRow>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding course {}: {}", id, e);
            AppError::Database(format!("Failed to find course: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Course>> {
        debug!("Finding all courses with limit {} offset {}", limit, offset);

        let rows = sqlx::query_as::<Postgres, CourseRow>(&format!(
            "SELECT {} FROM courses ORDER BY course_code LIMIT $1 OFFSET $2",
            COURSE_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding courses: {}", e);
            AppError::Database(format!("Failed to fetch courses: {}", e))
        })?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting courses: {}", e);
                AppError::Database(format!("Failed to count courses: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity), fields(code = %entity.course_code))]
    async fn create(&self, entity: &Course) -> AppResult<Course> {
        debug!("Creating course");

        let row = sqlx::query_as::<Postgres, CourseRow>(&format!(
            r#"
            INSERT INTO courses (
                course_code, name, provider, description, fee,
                start_date, end_date, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COURSE_COLUMNS
        ))
        .bind(entity.course_code.trim().to_uppercase())
        .bind(&entity.name)
        .bind(&entity.provider)
        .bind(&entity.description)
        .bind(entity.fee)
        .bind(entity.start_date)
        .bind(entity.end_date)
        .bind(entity.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating course: {}", e);
            if is_unique_violation(&e) {
                AppError::AlreadyExists(format!("Course {} already exists", entity.course_code))
            } else {
                AppError::Database(format!("Failed to create course: {}", e))
            }
        })?;

        row.try_into()
    }

    #[instrument(skip(self, entity), fields(id = entity.id))]
    async fn update(&self, entity: &Course) -> AppResult<Course> {
        debug!("Updating course: {}", entity.id);

        let row = sqlx::query_as::<Postgres, CourseRow>(&format!(
            r#"
            UPDATE courses
            SET course_code = $2,
                name = $3,
                provider = $4,
                description = $5,
                fee = $6,
                start_date = $7,
                end_date = $8,
                status = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COURSE_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.course_code.trim().to_uppercase())
        .bind(&entity.name)
        .bind(&entity.provider)
        .bind(&entity.description)
        .bind(entity.fee)
        .bind(entity.start_date)
        .bind(entity.end_date)
        .bind(entity.status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating course {}: {}", entity.id, e);
            if is_unique_violation(&e) {
                AppError::AlreadyExists(format!("Course {} already exists", entity.course_code))
            } else {
                AppError::Database(format!("Failed to update course: {}", e))
            }
        })?
        .ok_or_else(|| AppError::CourseNotFound(entity.id.to_string()))?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting course: {}", id);

        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting course {}: {}", id, e);
                if e.as_database_error().map(|d| d.is_foreign_key_violation()).unwrap_or(false) {
                    AppError::Conflict(format!("Course {} has enrollment history", id))
                } else {
                    AppError::Database(format!("Failed to delete course: {}", e))
                }
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CourseRepository for PgCourseRepository {
    #[instrument(skip(self))]
    async fn find_by_code(&self, course_code: &str) -> AppResult<Option<Course>> {
        debug!("Finding course by code: {}", course_code);

        let row = sqlx::query_as::<Postgres, CourseRow>(&format!(
            "SELECT {} FROM courses WHERE course_code = $1",
            COURSE_COLUMNS
        ))
        .bind(course_code.trim().to_uppercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding course by code: {}", e);
            AppError::Database(format!("Failed to find course: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, query))]
    async fn list_filtered(&self, query: &CourseQuery) -> AppResult<(Vec<Course>, i64)> {
        debug!("Listing courses: {:?}", query);

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses WHERE 1=1");
        push_course_filters(&mut count_qb, query);

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM courses WHERE 1=1",
            COURSE_COLUMNS
        ));
        push_course_filters(&mut qb, query);
        qb.push(" ORDER BY start_date DESC, course_code LIMIT ")
            .push_bind(query.pagination.limit())
            .push(" OFFSET ")
            .push_bind(query.pagination.offset());

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting courses: {}", e);
                AppError::Database(format!("Failed to count courses: {}", e))
            })?;

        let rows = qb
            .build_query_as::<CourseRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing courses: {}", e);
                AppError::Database(format!("Failed to fetch courses: {}", e))
            })?;

        let courses = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((courses, total))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    id: i32,
    course_code: String,
    name: String,
    provider: String,
    description: Option<String>,
    fee: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CourseRow> for Course {
    type Error = AppError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            course_code: row.course_code,
            name: row.name,
            provider: row.provider,
            description: row.description,
            fee: row.fee,
            start_date: row.start_date,
            end_date: row.end_date,
            status: parse_column("status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
