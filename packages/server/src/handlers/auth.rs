use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::*;
use tracing::{instrument, warn};

use crate::entity::{role, role_permission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    CreateUserRequest, CreateUserResponse, LoginRequest, LoginResponse, MeResponse,
    validate_create_user_request, validate_login_request,
};
use crate::state::AppState;
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in and obtain a bearer token",
    description = "Exchanges a username and password for a JWT carrying the account's role permissions. Logging out is done client-side by discarding the token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let username = payload.username.trim();

    let Some(user) = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(&state.db)
        .await?
    else {
        warn!("Login failed: unknown username");
        return Err(AppError::InvalidCredentials);
    };

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        warn!("Login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let permissions = role_permissions(&state.db, &user.role).await?;

    let token = jwt::sign(
        user.id,
        &user.username,
        &user.role,
        permissions.clone(),
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_days,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        username: user.username,
        role: user.role,
        permissions,
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get the current user",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(auth_user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth_user.user_id,
        username: auth_user.username,
        role: auth_user.role,
        permissions: auth_user.permissions,
    })
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Auth",
    operation_id = "createUser",
    summary = "Create a staff account",
    description = "Creates an account with the given role (default `viewer`). Requires `user:manage` permission.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = CreateUserResponse),
        (status = 400, description = "Validation error or unknown role (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Username taken (USERNAME_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(username = %payload.username))]
pub async fn create_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("user:manage")?;
    validate_create_user_request(&payload)?;

    let role_name = payload
        .role
        .as_deref()
        .map(str::trim)
        .unwrap_or(role::DEFAULT_ROLE)
        .to_string();
    if role::Entity::find_by_id(role_name.clone())
        .one(&state.db)
        .await?
        .is_none()
    {
        return Err(AppError::Validation(format!("Unknown role '{role_name}'")));
    }

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        username: Set(payload.username.trim().to_string()),
        password: Set(hash),
        role: Set(role_name),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::UsernameTaken,
        _ => AppError::from(e),
    })?;

    tracing::info!(user_id = user.id, role = %user.role, "Created account");
    Ok((StatusCode::CREATED, Json(CreateUserResponse::from(user))))
}

async fn role_permissions<C: ConnectionTrait>(db: &C, role: &str) -> Result<Vec<String>, DbErr> {
    let rows = role_permission::Entity::find()
        .filter(role_permission::Column::Role.eq(role))
        .order_by_asc(role_permission::Column::Permission)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|rp| rp.permission).collect())
}
