//! Aggregate queries behind the dashboard and profile pages.

use std::collections::HashMap;

use sea_orm::prelude::Expr;
use sea_orm::sea_query::Func;
use sea_orm::*;

use crate::entity::{class_info, course, score, student};
use crate::models::dashboard::{
    ClassDistribution, DashboardResponse, GradeAverages, RecentScore, RecentStudent,
};

/// How many recent students / scores the dashboard lists.
pub const RECENT_LIMIT: u64 = 5;

pub async fn dashboard<C: ConnectionTrait>(db: &C) -> Result<DashboardResponse, DbErr> {
    let total_students = student::Entity::find().count(db).await?;
    let total_classes = class_info::Entity::find().count(db).await?;
    let total_courses = course::Entity::find().count(db).await?;

    Ok(DashboardResponse {
        total_students,
        total_classes,
        total_courses,
        recent_students: recent_students(db, RECENT_LIMIT).await?,
        recent_scores: recent_scores(db, RECENT_LIMIT).await?,
        averages: grade_averages(db).await?,
        class_distribution: class_distribution(db).await?,
    })
}

/// Student count keyed by class ID. Classes without students are absent.
pub async fn student_counts_by_class<C: ConnectionTrait>(
    db: &C,
) -> Result<HashMap<String, u64>, DbErr> {
    let rows: Vec<(String, i64)> = student::Entity::find()
        .select_only()
        .column(student::Column::ClassId)
        .column_as(student::Column::Id.count(), "student_count")
        .group_by(student::Column::ClassId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(class_id, n)| (class_id, u64::try_from(n).unwrap_or(0)))
        .collect())
}

/// Every class with its student count, ordered by class name.
pub async fn class_distribution<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<ClassDistribution>, DbErr> {
    let counts = student_counts_by_class(db).await?;
    let classes = class_info::Entity::find()
        .order_by_asc(class_info::Column::Name)
        .all(db)
        .await?;

    Ok(classes
        .into_iter()
        .map(|c| ClassDistribution {
            student_count: counts.get(&c.id).copied().unwrap_or(0),
            class_id: c.id,
            class_name: c.name,
        })
        .collect())
}

pub async fn grade_averages<C: ConnectionTrait>(db: &C) -> Result<GradeAverages, DbErr> {
    let avg = |col: score::Column| Expr::expr(Func::avg(Expr::col(col)));

    let row: Option<(Option<f64>, Option<f64>, Option<f64>)> = score::Entity::find()
        .select_only()
        .column_as(avg(score::Column::RegularGrade), "avg_regular")
        .column_as(avg(score::Column::MidtermGrade), "avg_midterm")
        .column_as(avg(score::Column::FinalGrade), "avg_final")
        .into_tuple()
        .one(db)
        .await?;

    let (regular, midterm, final_exam) = row.unwrap_or_default();
    Ok(GradeAverages {
        regular: regular.map(common::grading::round2),
        midterm: midterm.map(common::grading::round2),
        final_exam: final_exam.map(common::grading::round2),
    })
}

pub async fn recent_students<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<RecentStudent>, DbErr> {
    let students = student::Entity::find()
        .order_by_desc(student::Column::CreatedAt)
        .order_by_desc(student::Column::Id)
        .limit(Some(limit))
        .all(db)
        .await?;

    let class_names = class_names(db, students.iter().map(|s| s.class_id.clone())).await?;

    Ok(students
        .into_iter()
        .map(|s| RecentStudent {
            class_name: class_names.get(&s.class_id).cloned().unwrap_or_default(),
            id: s.id,
            name: s.name,
            enrollment_date: s.enrollment_date,
            created_at: s.created_at,
        })
        .collect())
}

/// Most recently created or updated score records.
pub async fn recent_scores<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<RecentScore>, DbErr> {
    let scores = score::Entity::find()
        .order_by_desc(score::Column::UpdatedAt)
        .order_by_desc(score::Column::Id)
        .limit(Some(limit))
        .all(db)
        .await?;

    let names = RecordNames::load(db, &scores).await?;

    Ok(scores
        .into_iter()
        .map(|s| {
            let summary = s.summary();
            RecentScore {
                id: s.id,
                student_name: names.student(&s.student_id),
                course_name: names.course(&s.course_id),
                student_id: s.student_id,
                total: summary.total,
                grade_level: summary.grade_level,
                updated_at: s.updated_at,
            }
        })
        .collect())
}

/// Class names keyed by class ID for the given IDs.
pub async fn class_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = String>,
) -> Result<HashMap<String, String>, DbErr> {
    let ids: Vec<String> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(String, String)> = class_info::Entity::find()
        .select_only()
        .column(class_info::Column::Id)
        .column(class_info::Column::Name)
        .filter(class_info::Column::Id.is_in(ids))
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Student and course display names for a batch of score records.
pub struct RecordNames {
    students: HashMap<String, String>,
    courses: HashMap<String, String>,
}

impl RecordNames {
    pub async fn load<C: ConnectionTrait>(db: &C, scores: &[score::Model]) -> Result<Self, DbErr> {
        let student_ids: Vec<String> = scores.iter().map(|s| s.student_id.clone()).collect();
        let course_ids: Vec<String> = scores.iter().map(|s| s.course_id.clone()).collect();

        let students: Vec<(String, String)> = if student_ids.is_empty() {
            Vec::new()
        } else {
            student::Entity::find()
                .select_only()
                .column(student::Column::Id)
                .column(student::Column::Name)
                .filter(student::Column::Id.is_in(student_ids))
                .into_tuple()
                .all(db)
                .await?
        };
        let courses: Vec<(String, String)> = if course_ids.is_empty() {
            Vec::new()
        } else {
            course::Entity::find()
                .select_only()
                .column(course::Column::Id)
                .column(course::Column::Name)
                .filter(course::Column::Id.is_in(course_ids))
                .into_tuple()
                .all(db)
                .await?
        };

        Ok(Self {
            students: students.into_iter().collect(),
            courses: courses.into_iter().collect(),
        })
    }

    pub fn student(&self, id: &str) -> String {
        self.students.get(id).cloned().unwrap_or_default()
    }

    pub fn course(&self, id: &str) -> String {
        self.courses.get(id).cloned().unwrap_or_default()
    }
}
