pub mod gender;
pub mod grading;
pub mod score_sheet;
pub mod tabular;

pub use gender::Gender;
pub use grading::{GradeLevel, GradeSummary};
