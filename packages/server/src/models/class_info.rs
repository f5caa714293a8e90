use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{validate_code, validate_text};
use crate::entity::class_info;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateClassRequest {
    #[schema(example = "C2301")]
    pub id: String,
    #[schema(example = "计算机一班")]
    pub name: String,
    #[schema(example = "2023级")]
    pub grade: String,
    #[schema(example = "王老师")]
    pub adviser: String,
}

/// PATCH body. The class ID is immutable.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateClassRequest {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub adviser: Option<String>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClassResponse {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub adviser: String,
    /// Number of students enrolled in the class.
    pub student_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassResponse {
    pub fn new(model: class_info::Model, student_count: u64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            grade: model.grade,
            adviser: model.adviser,
            student_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub fn validate_create_class(payload: &CreateClassRequest) -> Result<(), AppError> {
    validate_code(&payload.id, "Class ID")?;
    validate_text(&payload.name, "Class name", 100)?;
    validate_text(&payload.grade, "Grade", 50)?;
    validate_text(&payload.adviser, "Adviser", 100)?;
    Ok(())
}

pub fn validate_update_class(payload: &UpdateClassRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_text(name, "Class name", 100)?;
    }
    if let Some(ref grade) = payload.grade {
        validate_text(grade, "Grade", 50)?;
    }
    if let Some(ref adviser) = payload.adviser {
        validate_text(adviser, "Adviser", 100)?;
    }
    Ok(())
}
