pub mod auth;
pub mod class_info;
pub mod course;
pub mod dashboard;
pub mod import;
pub mod score;
pub mod shared;
pub mod student;
