use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{course, score};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::course::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Courses",
    operation_id = "listCourses",
    summary = "List courses ordered by name",
    responses(
        (status = 200, description = "List of courses", body = Vec<CourseResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_courses(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    let courses = course::Entity::find()
        .order_by_asc(course::Column::Name)
        .order_by_asc(course::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Courses",
    operation_id = "getCourse",
    summary = "Get a course by ID",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course details", body = CourseResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_course(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, AppError> {
    Ok(Json(find_course(&state.db, &id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Courses",
    operation_id = "createCourse",
    summary = "Create a course",
    description = "Requires `course:manage` permission. Credits must be 1-10.",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Duplicate course ID (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id = %payload.id))]
pub async fn create_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("course:manage")?;
    validate_create_course(&payload)?;

    let id = payload.id.trim().to_string();
    if course::Entity::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!("Course {id} already exists")));
    }

    let now = chrono::Utc::now();
    let model = course::ActiveModel {
        id: Set(id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description.trim().to_string()),
        credits: Set(payload.credits),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Course already exists"))?;

    state.evict_stats();
    info!(course_id = %model.id, "Created course");
    Ok((StatusCode::CREATED, Json(CourseResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Courses",
    operation_id = "updateCourse",
    summary = "Update a course",
    description = "Partially updates a course. Requires `course:manage` permission.",
    params(("id" = String, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateCourseRequest>,
) -> Result<Json<CourseResponse>, AppError> {
    auth_user.require_permission("course:manage")?;
    validate_update_course(&payload)?;

    let existing = find_course(&state.db, &id).await?;
    if payload == UpdateCourseRequest::default() {
        return Ok(Json(existing.into()));
    }

    let mut active: course::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(ref description) = payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(credits) = payload.credits {
        active.credits = Set(credits);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    state.evict_stats();
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Courses",
    operation_id = "deleteCourse",
    summary = "Delete a course",
    description = "Deletes a course and every score recorded for it. Requires `course:manage` permission.",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Course not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("course:manage")?;

    let txn = state.db.begin().await?;
    find_course(&txn, &id).await?;

    score::Entity::delete_many()
        .filter(score::Column::CourseId.eq(id.as_str()))
        .exec(&txn)
        .await?;
    course::Entity::delete_by_id(id.clone()).exec(&txn).await?;

    txn.commit().await?;
    state.evict_stats();
    info!(course_id = %id, "Deleted course");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_course<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> Result<course::Model, AppError> {
    course::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".into()))
}
