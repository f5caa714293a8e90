use chrono::{DateTime, NaiveDate, Utc};
use common::GradeLevel;
use serde::{Deserialize, Serialize};

/// Component averages across every score record. `None` when there are no scores.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GradeAverages {
    pub regular: Option<f64>,
    pub midterm: Option<f64>,
    #[serde(rename = "final")]
    pub final_exam: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClassDistribution {
    pub class_id: String,
    pub class_name: String,
    pub student_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecentStudent {
    pub id: String,
    pub name: String,
    pub class_name: String,
    pub enrollment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecentScore {
    pub id: i32,
    pub student_id: String,
    pub student_name: String,
    pub course_name: String,
    pub total: f64,
    pub grade_level: GradeLevel,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate statistics shown on the landing page. Cached for a few minutes.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub total_students: u64,
    pub total_classes: u64,
    pub total_courses: u64,
    pub recent_students: Vec<RecentStudent>,
    pub recent_scores: Vec<RecentScore>,
    pub averages: GradeAverages,
    pub class_distribution: Vec<ClassDistribution>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub total_students: u64,
    pub total_scores: u64,
    pub recent_scores: Vec<RecentScore>,
}
