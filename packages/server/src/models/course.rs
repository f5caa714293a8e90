use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{validate_code, validate_text};
use crate::entity::course;
use crate::error::AppError;

pub const MIN_CREDITS: i32 = 1;
pub const MAX_CREDITS: i32 = 10;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCourseRequest {
    #[schema(example = "03")]
    pub id: String,
    #[schema(example = "数据结构")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = 4)]
    pub credits: i32,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateCourseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub credits: Option<i32>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub credits: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<course::Model> for CourseResponse {
    fn from(m: course::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            credits: m.credits,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

fn validate_credits(credits: i32) -> Result<(), AppError> {
    if !(MIN_CREDITS..=MAX_CREDITS).contains(&credits) {
        return Err(AppError::Validation(format!(
            "Credits must be between {MIN_CREDITS} and {MAX_CREDITS}"
        )));
    }
    Ok(())
}

pub fn validate_create_course(payload: &CreateCourseRequest) -> Result<(), AppError> {
    validate_code(&payload.id, "Course ID")?;
    validate_text(&payload.name, "Course name", 100)?;
    validate_credits(payload.credits)
}

pub fn validate_update_course(payload: &UpdateCourseRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_text(name, "Course name", 100)?;
    }
    if let Some(credits) = payload.credits {
        validate_credits(credits)?;
    }
    Ok(())
}
