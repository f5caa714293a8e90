use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{course, score, student};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::score::*;
use crate::models::shared::{Pagination, page_offset, page_params};
use crate::state::AppState;
use crate::stats::RecordNames;

const DUPLICATE_PAIR: &str = "A score for this student and course already exists";

#[utoipa::path(
    get,
    path = "/",
    tag = "Scores",
    operation_id = "listScores",
    summary = "List scores with pagination",
    description = "Returns scores newest first, 10 per page by default, optionally filtered by student and/or course. Each item carries its weighted total and letter grade. Requires `score:view` permission.",
    params(ScoreListQuery),
    responses(
        (status = 200, description = "List of scores", body = ScoreListResponse),
        (status = 400, description = "Malformed query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_scores(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ScoreListQuery>,
) -> Result<Json<ScoreListResponse>, AppError> {
    auth_user.require_permission("score:view")?;

    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = score::Entity::find();
    if let Some(ref sid) = query.student_id {
        select = select.filter(score::Column::StudentId.eq(sid.trim()));
    }
    if let Some(ref cid) = query.course_id {
        select = select.filter(score::Column::CourseId.eq(cid.trim()));
    }

    let total = select.clone().count(&state.db).await?;
    let total_pages = total.div_ceil(per_page);

    let scores = select
        .order_by_desc(score::Column::CreatedAt)
        .order_by_desc(score::Column::Id)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let names = RecordNames::load(&state.db, &scores).await?;
    let data = scores
        .into_iter()
        .map(|s| {
            let student_name = names.student(&s.student_id);
            let course_name = names.course(&s.course_id);
            ScoreResponse::new(s, student_name, course_name)
        })
        .collect();

    Ok(Json(ScoreListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Scores",
    operation_id = "getScore",
    summary = "Get a score by ID",
    description = "Requires `score:view` permission.",
    params(("id" = i32, Path, description = "Score ID")),
    responses(
        (status = 200, description = "Score details", body = ScoreResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Score not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_score(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ScoreResponse>, AppError> {
    auth_user.require_permission("score:view")?;

    let model = find_score(&state.db, id).await?;
    Ok(Json(to_response(&state.db, model).await?))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Scores",
    operation_id = "createScore",
    summary = "Record a score",
    description = "Requires `score:create` permission. Each component must be within 0-100. A student has at most one score per course: an existing pair is rejected with 409 before anything is written.",
    request_body = CreateScoreRequest,
    responses(
        (status = 201, description = "Score created", body = ScoreResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Score for this pair exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = %payload.student_id, course_id = %payload.course_id))]
pub async fn create_score(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("score:create")?;
    validate_create_score(&payload)?;

    let student = require_student(&state.db, payload.student_id.trim()).await?;
    let course = require_course(&state.db, payload.course_id.trim()).await?;

    if pair_taken(&state.db, &student.id, &course.id, None).await? {
        return Err(AppError::Conflict(DUPLICATE_PAIR.into()));
    }

    let now = chrono::Utc::now();
    let model = score::ActiveModel {
        student_id: Set(student.id),
        course_id: Set(course.id),
        regular_grade: Set(payload.regular_grade),
        midterm_grade: Set(payload.midterm_grade),
        final_grade: Set(payload.final_grade),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_PAIR))?;

    state.evict_stats();
    info!(score_id = model.id, "Created score");
    Ok((
        StatusCode::CREATED,
        Json(ScoreResponse::new(model, student.name, course.name)),
    ))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Scores",
    operation_id = "updateScore",
    summary = "Update a score",
    description = "Partially updates a score. Requires `score:edit` permission. Moving the score to another student or course is rejected with 409 if that pair already has a score.",
    params(("id" = i32, Path, description = "Score ID")),
    request_body = UpdateScoreRequest,
    responses(
        (status = 200, description = "Score updated", body = ScoreResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Score not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Score for this pair exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_score(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    auth_user.require_permission("score:edit")?;
    validate_update_score(&payload)?;

    let existing = find_score(&state.db, id).await?;
    if payload == UpdateScoreRequest::default() {
        return Ok(Json(to_response(&state.db, existing).await?));
    }

    let student_id = match payload.student_id {
        Some(ref sid) => require_student(&state.db, sid.trim()).await?.id,
        None => existing.student_id.clone(),
    };
    let course_id = match payload.course_id {
        Some(ref cid) => require_course(&state.db, cid.trim()).await?.id,
        None => existing.course_id.clone(),
    };
    if (student_id != existing.student_id || course_id != existing.course_id)
        && pair_taken(&state.db, &student_id, &course_id, Some(id)).await?
    {
        return Err(AppError::Conflict(DUPLICATE_PAIR.into()));
    }

    let mut active: score::ActiveModel = existing.into();
    active.student_id = Set(student_id);
    active.course_id = Set(course_id);
    if let Some(v) = payload.regular_grade {
        active.regular_grade = Set(v);
    }
    if let Some(v) = payload.midterm_grade {
        active.midterm_grade = Set(v);
    }
    if let Some(v) = payload.final_grade {
        active.final_grade = Set(v);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active
        .update(&state.db)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_PAIR))?;
    state.evict_stats();
    Ok(Json(to_response(&state.db, model).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Scores",
    operation_id = "deleteScore",
    summary = "Delete a score",
    description = "Requires `score:delete` permission.",
    params(("id" = i32, Path, description = "Score ID")),
    responses(
        (status = 204, description = "Score deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Score not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_score(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("score:delete")?;

    let result = score::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Score not found".into()));
    }

    state.evict_stats();
    info!(score_id = id, "Deleted score");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_score<C: ConnectionTrait>(db: &C, id: i32) -> Result<score::Model, AppError> {
    score::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Score not found".into()))
}

async fn require_student<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> Result<student::Model, AppError> {
    student::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Student {id} does not exist")))
}

async fn require_course<C: ConnectionTrait>(db: &C, id: &str) -> Result<course::Model, AppError> {
    course::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Course {id} does not exist")))
}

/// Whether another score already holds this (student, course) pair.
async fn pair_taken<C: ConnectionTrait>(
    db: &C,
    student_id: &str,
    course_id: &str,
    except: Option<i32>,
) -> Result<bool, AppError> {
    let mut select = score::Entity::find()
        .filter(score::Column::StudentId.eq(student_id))
        .filter(score::Column::CourseId.eq(course_id));
    if let Some(id) = except {
        select = select.filter(score::Column::Id.ne(id));
    }
    Ok(select.count(db).await? > 0)
}

async fn to_response<C: ConnectionTrait>(
    db: &C,
    model: score::Model,
) -> Result<ScoreResponse, AppError> {
    let names = RecordNames::load(db, std::slice::from_ref(&model)).await?;
    let student_name = names.student(&model.student_id);
    let course_name = names.course(&model.course_id);
    Ok(ScoreResponse::new(model, student_name, course_name))
}
