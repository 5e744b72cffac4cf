pub mod course;
pub mod marking;
pub mod report;
pub mod user;
