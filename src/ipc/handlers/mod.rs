pub mod auth;
pub mod changes;
pub mod core;
pub mod courses;
pub mod dormitory;
pub mod profiles;
pub mod records;
pub mod reports;
pub mod students;
