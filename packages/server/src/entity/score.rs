use common::grading::{self, GradeSummary};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Raw component scores of one student in one course. The weighted total and letter
/// band are derived on read, see [`Model::summary`].
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "score")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "student_course")]
    pub student_id: String,
    #[sea_orm(belongs_to, from = "student_id", to = "id")]
    pub student: HasOne<super::student::Entity>,

    #[sea_orm(unique_key = "student_course")]
    pub course_id: String,
    #[sea_orm(belongs_to, from = "course_id", to = "id")]
    pub course: HasOne<super::course::Entity>,

    pub regular_grade: f64,
    pub midterm_grade: f64,
    pub final_grade: f64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn summary(&self) -> GradeSummary {
        grading::summarize(
            Some(self.regular_grade),
            Some(self.midterm_grade),
            Some(self.final_grade),
        )
    }
}

impl ActiveModelBehavior for ActiveModel {}
