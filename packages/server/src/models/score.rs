use chrono::{DateTime, Utc};
use common::GradeLevel;
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, validate_grade};
use crate::entity::score;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateScoreRequest {
    #[schema(example = "20230001")]
    pub student_id: String,
    #[schema(example = "03")]
    pub course_id: String,
    #[schema(example = 80.0)]
    pub regular_grade: f64,
    #[schema(example = 70.0)]
    pub midterm_grade: f64,
    #[schema(example = 90.0)]
    pub final_grade: f64,
}

/// PATCH body. Changing `student_id` or `course_id` re-checks the pair for uniqueness.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateScoreRequest {
    pub student_id: Option<String>,
    pub course_id: Option<String>,
    pub regular_grade: Option<f64>,
    pub midterm_grade: Option<f64>,
    pub final_grade: Option<f64>,
}

/// A score record with its derived total and letter band.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ScoreResponse {
    pub id: i32,
    pub student_id: String,
    pub student_name: String,
    pub course_id: String,
    pub course_name: String,
    pub regular_grade: f64,
    pub midterm_grade: f64,
    pub final_grade: f64,
    #[schema(example = 81.0)]
    pub total: f64,
    pub grade_level: GradeLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoreResponse {
    pub fn new(m: score::Model, student_name: String, course_name: String) -> Self {
        let summary = m.summary();
        Self {
            id: m.id,
            student_id: m.student_id,
            student_name,
            course_id: m.course_id,
            course_name,
            regular_grade: m.regular_grade,
            midterm_grade: m.midterm_grade,
            final_grade: m.final_grade,
            total: summary.total,
            grade_level: summary.grade_level,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ScoreListResponse {
    pub data: Vec<ScoreResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScoreListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Only scores of this student.
    pub student_id: Option<String>,
    /// Only scores in this course.
    pub course_id: Option<String>,
}

pub fn validate_create_score(payload: &CreateScoreRequest) -> Result<(), AppError> {
    if payload.student_id.trim().is_empty() {
        return Err(AppError::Validation("Student must be selected".into()));
    }
    if payload.course_id.trim().is_empty() {
        return Err(AppError::Validation("Course must be selected".into()));
    }
    validate_grade(payload.regular_grade, "Regular grade")?;
    validate_grade(payload.midterm_grade, "Midterm grade")?;
    validate_grade(payload.final_grade, "Final grade")?;
    Ok(())
}

pub fn validate_update_score(payload: &UpdateScoreRequest) -> Result<(), AppError> {
    if let Some(ref id) = payload.student_id
        && id.trim().is_empty()
    {
        return Err(AppError::Validation("Student must be selected".into()));
    }
    if let Some(ref id) = payload.course_id
        && id.trim().is_empty()
    {
        return Err(AppError::Validation("Course must be selected".into()));
    }
    if let Some(v) = payload.regular_grade {
        validate_grade(v, "Regular grade")?;
    }
    if let Some(v) = payload.midterm_grade {
        validate_grade(v, "Midterm grade")?;
    }
    if let Some(v) = payload.final_grade {
        validate_grade(v, "Final grade")?;
    }
    Ok(())
}
