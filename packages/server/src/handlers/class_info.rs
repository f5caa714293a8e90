use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{class_info, score, student};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::class_info::*;
use crate::state::AppState;
use crate::stats;

#[utoipa::path(
    get,
    path = "/",
    tag = "Classes",
    operation_id = "listClasses",
    summary = "List classes",
    description = "Returns every class, newest first, with the number of enrolled students.",
    responses(
        (status = 200, description = "List of classes", body = Vec<ClassResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_classes(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassResponse>>, AppError> {
    let counts = stats::student_counts_by_class(&state.db).await?;
    let classes = class_info::Entity::find()
        .order_by_desc(class_info::Column::CreatedAt)
        .order_by_asc(class_info::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(
        classes
            .into_iter()
            .map(|c| {
                let n = counts.get(&c.id).copied().unwrap_or(0);
                ClassResponse::new(c, n)
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Classes",
    operation_id = "getClass",
    summary = "Get a class by ID",
    params(("id" = String, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class details", body = ClassResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_class(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClassResponse>, AppError> {
    let model = find_class(&state.db, &id).await?;
    let count = count_students(&state.db, &id).await?;
    Ok(Json(ClassResponse::new(model, count)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Classes",
    operation_id = "createClass",
    summary = "Create a class",
    description = "Requires `class:manage` permission. Returns 409 if the class ID is already used.",
    request_body = CreateClassRequest,
    responses(
        (status = 201, description = "Class created", body = ClassResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Duplicate class ID (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id = %payload.id))]
pub async fn create_class(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("class:manage")?;
    validate_create_class(&payload)?;

    let id = payload.id.trim().to_string();
    if class_info::Entity::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!("Class {id} already exists")));
    }

    let now = chrono::Utc::now();
    let model = class_info::ActiveModel {
        id: Set(id),
        name: Set(payload.name.trim().to_string()),
        grade: Set(payload.grade.trim().to_string()),
        adviser: Set(payload.adviser.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Class already exists"))?;

    state.evict_stats();
    info!(class_id = %model.id, "Created class");
    Ok((StatusCode::CREATED, Json(ClassResponse::new(model, 0))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Classes",
    operation_id = "updateClass",
    summary = "Update a class",
    description = "Partially updates a class. Requires `class:manage` permission. An empty payload returns the current resource unchanged.",
    params(("id" = String, Path, description = "Class ID")),
    request_body = UpdateClassRequest,
    responses(
        (status = 200, description = "Class updated", body = ClassResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_class(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateClassRequest>,
) -> Result<Json<ClassResponse>, AppError> {
    auth_user.require_permission("class:manage")?;
    validate_update_class(&payload)?;

    let existing = find_class(&state.db, &id).await?;
    let count = count_students(&state.db, &id).await?;
    if payload == UpdateClassRequest::default() {
        return Ok(Json(ClassResponse::new(existing, count)));
    }

    let mut active: class_info::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(ref grade) = payload.grade {
        active.grade = Set(grade.trim().to_string());
    }
    if let Some(ref adviser) = payload.adviser {
        active.adviser = Set(adviser.trim().to_string());
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    state.evict_stats();
    Ok(Json(ClassResponse::new(model, count)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Classes",
    operation_id = "deleteClass",
    summary = "Delete a class",
    description = "Deletes a class together with its students and their scores. Requires `class:manage` permission.",
    params(("id" = String, Path, description = "Class ID")),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_class(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("class:manage")?;

    let txn = state.db.begin().await?;
    find_class(&txn, &id).await?;

    let scores = score::Entity::delete_many()
        .filter(
            score::Column::StudentId.in_subquery(
                SeaQuery::select()
                    .column(student::Column::Id)
                    .from(student::Entity)
                    .and_where(student::Column::ClassId.eq(id.as_str()))
                    .to_owned(),
            ),
        )
        .exec(&txn)
        .await?;
    let students = student::Entity::delete_many()
        .filter(student::Column::ClassId.eq(id.as_str()))
        .exec(&txn)
        .await?;
    class_info::Entity::delete_by_id(id.clone()).exec(&txn).await?;

    txn.commit().await?;
    state.evict_stats();
    info!(
        class_id = %id,
        students = students.rows_affected,
        scores = scores.rows_affected,
        "Deleted class"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_class<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> Result<class_info::Model, AppError> {
    class_info::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Class not found".into()))
}

async fn count_students<C: ConnectionTrait>(db: &C, class_id: &str) -> Result<u64, AppError> {
    Ok(student::Entity::find()
        .filter(student::Column::ClassId.eq(class_id))
        .count(db)
        .await?)
}
