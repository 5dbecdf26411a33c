//! Course catalogue service

use chrono::NaiveDate;
use edufund_core::{
    models::{Course, CourseStatus},
    query::CourseQuery,
    traits::{CourseRepository, EnrollmentRepository, PaginatedResponse},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Partial update of a course; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub description: Option<String>,
    pub fee: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<CourseStatus>,
}

fn validate_course(course: &Course) -> AppResult<()> {
    if course.course_code.is_empty() {
        return Err(AppError::MissingField("course_code".to_string()));
    }
    if course.name.trim().is_empty() {
        return Err(AppError::MissingField("name".to_string()));
    }
    course.validate_schedule().map_err(AppError::Validation)
}

/// Course catalogue maintenance
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl CourseService {
    pub fn new(courses: Arc<dyn CourseRepository>, enrollments: Arc<dyn EnrollmentRepository>) -> Self {
        Self {
            courses,
            enrollments,
        }
    }

    pub async fn list(&self, query: &CourseQuery) -> AppResult<PaginatedResponse<Course>> {
        let (courses, total) = self.courses.list_filtered(query).await?;
        Ok(PaginatedResponse::new(courses, total, query.pagination))
    }

    pub async fn get(&self, id: i32) -> AppResult<Course> {
        self.courses
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CourseNotFound(id.to_string()))
    }

    #[instrument(skip(self, course), fields(code = %course.course_code))]
    pub async fn create(&self, mut course: Course) -> AppResult<Course> {
        course.course_code = course.course_code.trim().to_ascii_uppercase();
        course.name = course.name.trim().to_string();
        validate_course(&course)?;

        if self
            .courses
            .find_by_code(&course.course_code)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(format!(
                "Course {} already exists",
                course.course_code
            )));
        }

        let created = self.courses.create(&course).await?;
        info!(course_id = created.id, "Course created");
        Ok(created)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: i32, changes: CourseChanges) -> AppResult<Course> {
        let mut course = self.get(id).await?;

        if let Some(name) = changes.name {
            course.name = name.trim().to_string();
        }
        if let Some(provider) = changes.provider {
            course.provider = provider.trim().to_string();
        }
        if let Some(description) = changes.description {
            course.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(fee) = changes.fee {
            course.fee = fee;
        }
        if let Some(start) = changes.start_date {
            course.start_date = start;
        }
        if let Some(end) = changes.end_date {
            course.end_date = end;
        }
        if let Some(status) = changes.status {
            course.status = status;
        }
        validate_course(&course)?;

        self.courses.update(&course).await
    }

    /// Delete a course with no active enrollments
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let active = self.enrollments.count_active_by_course(id).await?;
        if active > 0 {
            warn!(active, "Refused to delete course with active enrollments");
            return Err(AppError::Conflict(format!(
                "Course {} has {} active enrollments",
                id, active
            )));
        }

        if !self.courses.delete(id).await? {
            return Err(AppError::CourseNotFound(id.to_string()));
        }
        info!("Course deleted");
        Ok(())
    }
}
