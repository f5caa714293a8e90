use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use common::score_sheet::{EXPORT_COLUMNS, IMPORT_COLUMNS, format_number};
use common::tabular;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::score;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::import::ScoreImporter;
use crate::models::import::ImportResponse;
use crate::state::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[utoipa::path(
    post,
    path = "/import",
    tag = "Score Files",
    operation_id = "importScores",
    summary = "Bulk import scores from a CSV sheet",
    description = "Upserts one score per row from a sheet with the columns 学号, 课程编号, 平时成绩, 期中成绩, 期末成绩. A missing column or unreadable file rejects the whole upload with 400. Otherwise every row is processed independently and rejected rows are reported with their sheet row number (header = row 1). Requires `score:import` permission.",
    request_body(content_type = "multipart/form-data", description = "CSV file in the `file` field"),
    responses(
        (status = 200, description = "Import finished", body = ImportResponse),
        (status = 400, description = "Missing file, unreadable file, or missing columns (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user = %auth_user.username))]
pub async fn import_scores(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    auth_user.require_permission("score:import")?;

    let mut file: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
            file = Some(data.to_vec());
            break;
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let report = ScoreImporter::new(&state.db, &state.stats_cache)
        .import(&file)
        .await?;

    Ok(Json(report.into()))
}

#[utoipa::path(
    get,
    path = "/export",
    tag = "Score Files",
    operation_id = "exportScores",
    summary = "Export every score as CSV",
    description = "Columns: 学号, 课程编号, 平时成绩, 期中成绩, 期末成绩, 总成绩, 等级. Rows are ordered by student then course. Requires `score:export` permission.",
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn export_scores(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("score:export")?;

    let scores = score::Entity::find()
        .order_by_asc(score::Column::StudentId)
        .order_by_asc(score::Column::CourseId)
        .all(&state.db)
        .await?;
    let count = scores.len();

    let body = tabular::write_csv(&EXPORT_COLUMNS, scores.into_iter().map(export_row))
        .map_err(|e| AppError::Internal(format!("CSV export error: {e}")))?;

    info!(rows = count, "Exported scores");
    Ok(csv_response("scores.csv", body))
}

#[utoipa::path(
    get,
    path = "/import/template",
    tag = "Score Files",
    operation_id = "downloadImportTemplate",
    summary = "Download a blank import sheet",
    description = "A CSV with the five import headers and no data rows. Requires `score:import` or `score:export` permission.",
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user))]
pub async fn import_template(auth_user: AuthUser) -> Result<impl IntoResponse, AppError> {
    auth_user.require_any_permission(&["score:import", "score:export"])?;

    let body = tabular::write_csv(&IMPORT_COLUMNS, Vec::<Vec<String>>::new())
        .map_err(|e| AppError::Internal(format!("CSV template error: {e}")))?;
    Ok(csv_response("score_import_template.csv", body))
}

/// Body limit layer for the upload route.
pub fn import_body_limit(max_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_bytes)
}

fn export_row(s: score::Model) -> Vec<String> {
    let summary = s.summary();
    vec![
        s.student_id,
        s.course_id,
        format_number(s.regular_grade),
        format_number(s.midterm_grade),
        format_number(s.final_grade),
        format_number(summary.total),
        summary.grade_level.to_string(),
    ]
}

fn csv_response(filename: &str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}
