use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Request body for creating a staff account.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "li_wei")]
    pub username: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// Role name. Defaults to `viewer`.
    #[schema(example = "staff")]
    pub role: Option<String>,
}

pub fn validate_create_user_request(payload: &CreateUserRequest) -> Result<(), AppError> {
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "li_wei")]
    pub username: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Newly created account.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateUserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "li_wei")]
    pub username: String,
    #[schema(example = "staff")]
    pub role: String,
}

impl From<crate::entity::user::Model> for CreateUserResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// Successful login response.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token. Log out by discarding it.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = "li_wei")]
    pub username: String,
    #[schema(example = "staff")]
    pub role: String,
    #[schema(example = json!(["student:view", "score:import"]))]
    pub permissions: Vec<String>,
}

/// Current authenticated user's profile.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "li_wei")]
    pub username: String,
    #[schema(example = "staff")]
    pub role: String,
    #[schema(example = json!(["student:view", "score:import"]))]
    pub permissions: Vec<String>,
}
