use chrono::{DateTime, NaiveDate, Utc};
use common::{GradeLevel, Gender};
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, double_option, validate_text};
use crate::entity::student;
use crate::error::AppError;

pub const MAX_AGE: i32 = 150;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateStudentRequest {
    /// Student number, digits only.
    #[schema(example = "20230001")]
    pub id: String,
    #[schema(example = "张三")]
    pub name: String,
    pub gender: Gender,
    #[schema(example = 19)]
    pub age: i32,
    #[schema(example = "C2301")]
    pub class_id: String,
    pub enrollment_date: NaiveDate,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// PATCH body. `phone`, `email` and `address` accept `null` to clear the value.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i32>,
    pub class_id: Option<String>,
    pub enrollment_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudentResponse {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub age: i32,
    pub class_id: String,
    pub class_name: String,
    pub enrollment_date: NaiveDate,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentResponse {
    pub fn new(m: student::Model, class_name: String) -> Self {
        Self {
            id: m.id,
            name: m.name,
            gender: m.gender,
            age: m.age,
            class_id: m.class_id,
            class_name,
            enrollment_date: m.enrollment_date,
            phone: m.phone,
            email: m.email,
            address: m.address,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudentListItem {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub age: i32,
    pub class_id: String,
    pub class_name: String,
    pub enrollment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl StudentListItem {
    pub fn new(m: student::Model, class_name: String) -> Self {
        Self {
            id: m.id,
            name: m.name,
            gender: m.gender,
            age: m.age,
            class_id: m.class_id,
            class_name,
            enrollment_date: m.enrollment_date,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudentListResponse {
    pub data: Vec<StudentListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive match on student name, student ID, or class name.
    pub search: Option<String>,
}

/// One row of a student's transcript.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudentScoreItem {
    pub score_id: i32,
    pub course_id: String,
    pub course_name: String,
    pub credits: i32,
    pub regular_grade: f64,
    pub midterm_grade: f64,
    pub final_grade: f64,
    pub total: f64,
    pub grade_level: GradeLevel,
}

fn validate_student_id(id: &str) -> Result<(), AppError> {
    if id.is_empty() || id.chars().count() > 20 || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Student ID must be 1-20 digits".into(),
        ));
    }
    Ok(())
}

fn validate_age(age: i32) -> Result<(), AppError> {
    if !(0..=MAX_AGE).contains(&age) {
        return Err(AppError::Validation(format!(
            "Age must be between 0 and {MAX_AGE}"
        )));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), AppError> {
    if phone.chars().count() > 20 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Phone must contain digits only".into(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if !email.contains('@') {
        return Err(AppError::Validation("Email must contain '@'".into()));
    }
    Ok(())
}

/// Trim an optional text field; blank becomes `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_create_student(payload: &CreateStudentRequest) -> Result<(), AppError> {
    validate_student_id(payload.id.trim())?;
    validate_text(&payload.name, "Name", 100)?;
    validate_age(payload.age)?;
    if payload.class_id.trim().is_empty() {
        return Err(AppError::Validation("Class must be selected".into()));
    }
    if let Some(phone) = normalize_optional(payload.phone.clone()) {
        validate_phone(&phone)?;
    }
    if let Some(email) = normalize_optional(payload.email.clone()) {
        validate_email(&email)?;
    }
    Ok(())
}

pub fn validate_update_student(payload: &UpdateStudentRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_text(name, "Name", 100)?;
    }
    if let Some(age) = payload.age {
        validate_age(age)?;
    }
    if let Some(ref class_id) = payload.class_id
        && class_id.trim().is_empty()
    {
        return Err(AppError::Validation("Class must be selected".into()));
    }
    if let Some(Some(phone)) = payload.phone.clone().map(normalize_optional) {
        validate_phone(&phone)?;
    }
    if let Some(Some(email)) = payload.email.clone().map(normalize_optional) {
        validate_email(&email)?;
    }
    Ok(())
}
