use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{class_info, course, score, student};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::shared::{Pagination, escape_like, page_offset, page_params};
use crate::models::student::*;
use crate::state::AppState;
use crate::stats;

#[utoipa::path(
    get,
    path = "/",
    tag = "Students",
    operation_id = "listStudents",
    summary = "List students with pagination and search",
    description = "Returns students newest first, 10 per page by default. `search` matches the student name, student ID, or class name case-insensitively. Requires `student:view` permission.",
    params(StudentListQuery),
    responses(
        (status = 200, description = "List of students", body = StudentListResponse),
        (status = 400, description = "Malformed query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_students(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<StudentListQuery>,
) -> Result<Json<StudentListResponse>, AppError> {
    auth_user.require_permission("student:view")?;

    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = student::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            let like = |col: Expr| {
                Expr::expr(Func::lower(col)).like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            select = select.filter(
                Condition::any()
                    .add(like(Expr::col(student::Column::Name)))
                    .add(like(Expr::col(student::Column::Id)))
                    .add(
                        student::Column::ClassId.in_subquery(
                            SeaQuery::select()
                                .column(class_info::Column::Id)
                                .from(class_info::Entity)
                                .and_where(like(Expr::col(class_info::Column::Name)))
                                .to_owned(),
                        ),
                    ),
            );
        }
    }

    let total = select.clone().count(&state.db).await?;
    let total_pages = total.div_ceil(per_page);

    let students = select
        .order_by_desc(student::Column::CreatedAt)
        .order_by_desc(student::Column::Id)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let class_names =
        stats::class_names(&state.db, students.iter().map(|s| s.class_id.clone())).await?;
    let data = students
        .into_iter()
        .map(|s| {
            let class_name = class_names.get(&s.class_id).cloned().unwrap_or_default();
            StudentListItem::new(s, class_name)
        })
        .collect();

    Ok(Json(StudentListResponse {
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
    tag = "Students",
    operation_id = "getStudent",
    summary = "Get a student by ID",
    description = "Requires `student:view` permission.",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = StudentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_student(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StudentResponse>, AppError> {
    auth_user.require_permission("student:view")?;

    let model = find_student(&state.db, &id).await?;
    Ok(Json(with_class_name(&state.db, model).await?))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Students",
    operation_id = "createStudent",
    summary = "Create a student",
    description = "Requires `student:create` permission. The class must exist. Returns 409 if the student ID is already used.",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Duplicate student ID (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id = %payload.id))]
pub async fn create_student(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("student:create")?;
    validate_create_student(&payload)?;

    let id = payload.id.trim().to_string();
    let class = require_class(&state.db, payload.class_id.trim()).await?;

    if student::Entity::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!("Student {id} already exists")));
    }

    let now = chrono::Utc::now();
    let model = student::ActiveModel {
        id: Set(id),
        name: Set(payload.name.trim().to_string()),
        gender: Set(payload.gender),
        age: Set(payload.age),
        class_id: Set(class.id),
        enrollment_date: Set(payload.enrollment_date),
        phone: Set(normalize_optional(payload.phone)),
        email: Set(normalize_optional(payload.email)),
        address: Set(normalize_optional(payload.address)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Student already exists"))?;

    state.evict_stats();
    info!(student_id = %model.id, "Created student");
    Ok((
        StatusCode::CREATED,
        Json(StudentResponse::new(model, class.name)),
    ))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Students",
    operation_id = "updateStudent",
    summary = "Update a student",
    description = "Partially updates a student. Requires `student:edit` permission. The student ID is immutable; `phone`, `email` and `address` may be set to `null`.",
    params(("id" = String, Path, description = "Student ID")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_student(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateStudentRequest>,
) -> Result<Json<StudentResponse>, AppError> {
    auth_user.require_permission("student:edit")?;
    validate_update_student(&payload)?;

    let existing = find_student(&state.db, &id).await?;
    if payload == UpdateStudentRequest::default() {
        return Ok(Json(with_class_name(&state.db, existing).await?));
    }

    let mut active: student::ActiveModel = existing.into();
    if let Some(ref class_id) = payload.class_id {
        let class = require_class(&state.db, class_id.trim()).await?;
        active.class_id = Set(class.id);
    }
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(gender) = payload.gender {
        active.gender = Set(gender);
    }
    if let Some(age) = payload.age {
        active.age = Set(age);
    }
    if let Some(date) = payload.enrollment_date {
        active.enrollment_date = Set(date);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(normalize_optional(phone));
    }
    if let Some(email) = payload.email {
        active.email = Set(normalize_optional(email));
    }
    if let Some(address) = payload.address {
        active.address = Set(normalize_optional(address));
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    state.evict_stats();
    Ok(Json(with_class_name(&state.db, model).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Students",
    operation_id = "deleteStudent",
    summary = "Delete a student",
    description = "Deletes a student and all of their scores. Requires `student:delete` permission.",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_student(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("student:delete")?;

    let txn = state.db.begin().await?;
    find_student(&txn, &id).await?;

    score::Entity::delete_many()
        .filter(score::Column::StudentId.eq(id.as_str()))
        .exec(&txn)
        .await?;
    student::Entity::delete_by_id(id.clone()).exec(&txn).await?;

    txn.commit().await?;
    state.evict_stats();
    info!(student_id = %id, "Deleted student");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/scores",
    tag = "Students",
    operation_id = "listStudentScores",
    summary = "List a student's scores",
    description = "Returns the student's scores ordered by course ID, each with its weighted total and letter grade. Requires `score:view` permission.",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Scores of the student", body = Vec<StudentScoreItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn list_student_scores(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StudentScoreItem>>, AppError> {
    auth_user.require_permission("score:view")?;
    find_student(&state.db, &id).await?;

    let scores = score::Entity::find()
        .filter(score::Column::StudentId.eq(id.as_str()))
        .order_by_asc(score::Column::CourseId)
        .all(&state.db)
        .await?;

    let courses: std::collections::HashMap<String, course::Model> = course::Entity::find()
        .filter(course::Column::Id.is_in(scores.iter().map(|s| s.course_id.clone())))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect();

    let items = scores
        .into_iter()
        .map(|s| {
            let summary = s.summary();
            let (course_name, credits) = courses
                .get(&s.course_id)
                .map(|c| (c.name.clone(), c.credits))
                .unwrap_or_default();
            StudentScoreItem {
                score_id: s.id,
                course_id: s.course_id,
                course_name,
                credits,
                regular_grade: s.regular_grade,
                midterm_grade: s.midterm_grade,
                final_grade: s.final_grade,
                total: summary.total,
                grade_level: summary.grade_level,
            }
        })
        .collect();

    Ok(Json(items))
}

pub(crate) async fn find_student<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> Result<student::Model, AppError> {
    student::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".into()))
}

/// A referenced class must exist; a dangling reference is a validation error, not a 404.
async fn require_class<C: ConnectionTrait>(
    db: &C,
    class_id: &str,
) -> Result<class_info::Model, AppError> {
    class_info::Entity::find_by_id(class_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Class {class_id} does not exist")))
}

async fn with_class_name<C: ConnectionTrait>(
    db: &C,
    model: student::Model,
) -> Result<StudentResponse, AppError> {
    let class_name = class_info::Entity::find_by_id(model.class_id.clone())
        .one(db)
        .await?
        .map(|c| c.name)
        .unwrap_or_default();
    Ok(StudentResponse::new(model, class_name))
}
