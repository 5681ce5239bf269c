pub mod academies;
pub mod attendance;
pub mod auth;
pub mod classrooms;
pub mod colleges;
pub mod content;
pub mod core;
pub mod dashboards;
pub mod departments;
pub mod grades;
pub mod lookups;
pub mod people;
pub mod setup;
pub mod stats;
pub mod student;
pub mod subjects;
