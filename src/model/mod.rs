pub mod attendance;
pub mod course;
pub mod role;
pub mod student;
pub mod user;
