//! Bulk score import from an uploaded sheet.
//!
//! The sheet is checked for the required columns up front; after that every row is
//! processed on its own and a bad row is recorded without stopping the batch. Rows
//! already written stay written.

use chrono::Utc;
use common::score_sheet::{self, COURSE_ID, FINAL, IMPORT_COLUMNS, MIDTERM, REGULAR, STUDENT_ID};
use common::tabular::{self, Cell, Row};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, Set};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{DASHBOARD_STATS_KEY, TtlCache};
use crate::entity::{course, score, student};
use crate::models::dashboard::DashboardResponse;

/// Sheet row number of the first data row. The header occupies row 1.
const FIRST_DATA_ROW: usize = 2;

/// Failure that aborts the whole import before any row is touched.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    Structural(String),
}

/// Why a single row was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("student {student_id} not found")]
    StudentNotFound { row: usize, student_id: String },
    #[error("course {course_id} not found")]
    CourseNotFound { row: usize, course_id: String },
    #[error("{column} must be numeric")]
    NotNumeric { row: usize, column: &'static str },
    #[error("{column} must be between 0 and 100, got {value}")]
    OutOfRange {
        row: usize,
        column: &'static str,
        value: f64,
    },
    #[error("unknown error while saving the row")]
    Unknown { row: usize, detail: String },
}

impl RowError {
    pub fn row(&self) -> usize {
        match self {
            RowError::StudentNotFound { row, .. }
            | RowError::CourseNotFound { row, .. }
            | RowError::NotNumeric { row, .. }
            | RowError::OutOfRange { row, .. }
            | RowError::Unknown { row, .. } => *row,
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub success_count: usize,
    /// Rejected rows in file order.
    pub errors: Vec<RowError>,
}

/// Validated grade cells of one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grades {
    pub regular: f64,
    pub midterm: f64,
    pub final_exam: f64,
}

pub struct ScoreImporter<'a, C: ConnectionTrait> {
    conn: &'a C,
    stats_cache: &'a TtlCache<DashboardResponse>,
}

impl<'a, C: ConnectionTrait> ScoreImporter<'a, C> {
    pub fn new(conn: &'a C, stats_cache: &'a TtlCache<DashboardResponse>) -> Self {
        Self { conn, stats_cache }
    }

    /// Parse `data` as a score sheet and upsert every valid row.
    pub async fn import(&self, data: &[u8]) -> Result<ImportReport, ImportError> {
        let table = tabular::read_csv(data)
            .map_err(|e| ImportError::Structural(format!("Unable to read file: {e}")))?;

        let missing = table.missing_columns(&IMPORT_COLUMNS);
        if !missing.is_empty() {
            return Err(ImportError::Structural(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut report = ImportReport::default();
        for (index, row) in table.rows.iter().enumerate() {
            let row_number = index + FIRST_DATA_ROW;
            match self.import_row(row_number, row).await {
                Ok(()) => {
                    report.success_count += 1;
                    self.stats_cache.delete(DASHBOARD_STATS_KEY);
                }
                Err(err) => {
                    debug!(row = row_number, error = %err, "Rejected import row");
                    report.errors.push(err);
                }
            }
        }

        info!(
            imported = report.success_count,
            rejected = report.errors.len(),
            "Score import finished"
        );
        Ok(report)
    }

    async fn import_row(&self, row_number: usize, row: &Row) -> Result<(), RowError> {
        let student_id = cell_text(row, STUDENT_ID);
        let course_id = cell_text(row, COURSE_ID);
        let unknown = |e: DbErr| {
            warn!(row = row_number, error = %e, "Storage error during import");
            RowError::Unknown {
                row: row_number,
                detail: e.to_string(),
            }
        };

        if !self.student_exists(&student_id).await.map_err(unknown)? {
            return Err(RowError::StudentNotFound {
                row: row_number,
                student_id,
            });
        }

        let course_id = self
            .resolve_course(&course_id)
            .await
            .map_err(unknown)?
            .ok_or(RowError::CourseNotFound {
                row: row_number,
                course_id,
            })?;

        let grades = parse_grades(row_number, row)?;

        self.upsert(&student_id, &course_id, grades)
            .await
            .map_err(unknown)
    }

    async fn student_exists(&self, id: &str) -> Result<bool, DbErr> {
        Ok(student::Entity::find_by_id(id.to_string())
            .count(self.conn)
            .await?
            > 0)
    }

    /// Look up a course by its code, retrying once with the zero-padded code.
    /// Returns the ID of the course that matched.
    async fn resolve_course(&self, raw: &str) -> Result<Option<String>, DbErr> {
        if let Some(found) = course::Entity::find_by_id(raw.to_string())
            .one(self.conn)
            .await?
        {
            return Ok(Some(found.id));
        }

        let padded = score_sheet::pad_course_id(raw);
        if padded == raw {
            return Ok(None);
        }
        Ok(course::Entity::find_by_id(padded)
            .one(self.conn)
            .await?
            .map(|c| c.id))
    }

    /// Insert the score, or overwrite the components of the existing one for this pair.
    async fn upsert(&self, student_id: &str, course_id: &str, grades: Grades) -> Result<(), DbErr> {
        let now = Utc::now();
        let model = score::ActiveModel {
            student_id: Set(student_id.to_string()),
            course_id: Set(course_id.to_string()),
            regular_grade: Set(grades.regular),
            midterm_grade: Set(grades.midterm),
            final_grade: Set(grades.final_exam),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        score::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([score::Column::StudentId, score::Column::CourseId])
                    .update_columns([
                        score::Column::RegularGrade,
                        score::Column::MidtermGrade,
                        score::Column::FinalGrade,
                        score::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }
}

fn cell_text(row: &Row, column: &str) -> String {
    row.get(column).map(Cell::to_trimmed_string).unwrap_or_default()
}

/// Read the three grade cells. Every cell must be numeric before any range check runs.
pub fn parse_grades(row_number: usize, row: &Row) -> Result<Grades, RowError> {
    let mut values = [0.0; 3];
    for (slot, column) in values.iter_mut().zip([REGULAR, MIDTERM, FINAL]) {
        *slot = row
            .get(column)
            .and_then(Cell::as_f64)
            .ok_or(RowError::NotNumeric {
                row: row_number,
                column,
            })?;
    }

    for (value, column) in values.iter().zip([REGULAR, MIDTERM, FINAL]) {
        if !(0.0..=100.0).contains(value) {
            return Err(RowError::OutOfRange {
                row: row_number,
                column,
                value: *value,
            });
        }
    }

    let [regular, midterm, final_exam] = values;
    Ok(Grades {
        regular,
        midterm,
        final_exam,
    })
}
