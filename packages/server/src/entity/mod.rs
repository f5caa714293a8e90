pub mod class_info;
pub mod course;
pub mod role;
pub mod role_permission;
pub mod score;
pub mod student;
pub mod user;
