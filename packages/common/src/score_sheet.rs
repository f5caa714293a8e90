//! Column layout of the score import/export sheets (zh-CN headers).

pub const STUDENT_ID: &str = "学号";
pub const COURSE_ID: &str = "课程编号";
pub const REGULAR: &str = "平时成绩";
pub const MIDTERM: &str = "期中成绩";
pub const FINAL: &str = "期末成绩";
pub const TOTAL: &str = "总成绩";
pub const GRADE_LEVEL: &str = "等级";

/// Columns an import sheet must carry. Also the header row of the blank template.
pub const IMPORT_COLUMNS: [&str; 5] = [STUDENT_ID, COURSE_ID, REGULAR, MIDTERM, FINAL];

/// Columns written by the score export: the raw components plus the derived fields.
pub const EXPORT_COLUMNS: [&str; 7] = [
    STUDENT_ID,
    COURSE_ID,
    REGULAR,
    MIDTERM,
    FINAL,
    TOTAL,
    GRADE_LEVEL,
];

/// Width course codes are zero-padded to when a lookup by the raw code misses.
pub const COURSE_ID_WIDTH: usize = 2;

/// Left-pad a course code with zeros to [`COURSE_ID_WIDTH`].
pub fn pad_course_id(id: &str) -> String {
    format!("{id:0>width$}", width = COURSE_ID_WIDTH)
}

/// Render a grade for a sheet cell. Integral values print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
