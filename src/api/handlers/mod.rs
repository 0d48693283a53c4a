pub mod academies;
pub mod announcements;
pub mod attendance;
pub mod auth;
pub mod batches;
pub mod core;
pub mod dashboard;
pub mod documents;
pub mod events;
pub mod exits;
pub mod exports;
pub mod notes;
pub mod results;
pub mod students;
pub mod syllabus;
pub mod todos;
pub mod weekly_plans;
