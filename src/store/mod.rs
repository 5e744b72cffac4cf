//! Persistence seams.
//!
//! `AttendanceStore` owns the attendance rows and the per-key uniqueness
//! invariant. `CourseDirectory` is the course-management collaborator the
//! attendance core consults for course existence, rosters and cascades.
//! `UserStore` holds the accounts behind login.
//! All are object safe so handlers receive them as `web::Data<dyn ...>`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::model::attendance::{
    AttendanceKey, AttendanceStatus, CourseAttendanceEntry, DateRange, PresentTally,
    StudentAttendanceEntry,
};
use crate::model::course::Course;
use crate::model::student::StudentProfile;
use crate::model::user::{NewUser, User, UserProfile};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Creates or replaces the mark for `key`. Atomic per key; concurrent
    /// calls for the same key converge to the last applied status.
    async fn upsert(
        &self,
        key: AttendanceKey,
        status: AttendanceStatus,
    ) -> Result<UpsertOutcome, StoreError>;

    fn find_by_student(
        &self,
        student_id: u64,
    ) -> BoxStream<'_, Result<StudentAttendanceEntry, StoreError>>;

    fn find_by_course(
        &self,
        course_id: u64,
    ) -> BoxStream<'_, Result<CourseAttendanceEntry, StoreError>>;

    /// Distinct lecture dates held for a course within `range`.
    async fn distinct_dates(
        &self,
        course_id: u64,
        range: DateRange,
    ) -> Result<BTreeSet<NaiveDate>, StoreError>;

    async fn count_by_status(
        &self,
        course_id: u64,
        student_id: u64,
        status: AttendanceStatus,
    ) -> Result<i64, StoreError>;

    /// One tally per student having at least one mark in `range`.
    async fn present_tallies(
        &self,
        course_id: u64,
        range: DateRange,
    ) -> Result<Vec<PresentTally>, StoreError>;

    /// Cascade used only when a course is deleted.
    async fn delete_all_for_course(&self, course_id: u64) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait CourseDirectory: Send + Sync {
    async fn get(&self, course_id: u64) -> Result<Option<Course>, StoreError>;

    async fn exists(&self, course_id: u64) -> Result<bool, StoreError> {
        Ok(self.get(course_id).await?.is_some())
    }

    /// Currently enrolled students, ordered by id.
    async fn roster(&self, course_id: u64) -> Result<Vec<StudentProfile>, StoreError>;

    async fn student(&self, student_id: u64) -> Result<Option<StudentProfile>, StoreError>;

    /// Ids from `student_ids` that do not resolve to a student, deduplicated.
    async fn missing_students(&self, student_ids: &[u64]) -> Result<Vec<u64>, StoreError>;

    async fn create_course(&self, title: &str, code: &str) -> Result<Course, StoreError>;

    async fn assign_teacher(&self, course_id: u64, teacher_id: u64) -> Result<(), StoreError>;

    async fn teacher_exists(&self, teacher_id: u64) -> Result<bool, StoreError>;

    /// Returns false when the student was already enrolled.
    async fn enroll(&self, course_id: u64, student_id: u64) -> Result<bool, StoreError>;

    /// Returns false when the student was not enrolled.
    async fn unenroll(&self, course_id: u64, student_id: u64) -> Result<bool, StoreError>;

    async fn delete_course(&self, course_id: u64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Account with its password hash, for credential checks.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn profile(&self, user_id: u64) -> Result<Option<UserProfile>, StoreError>;

    async fn record_login(&self, user_id: u64) -> Result<(), StoreError>;

    /// Creates the account together with its linked teacher or student
    /// record. A taken email is a `Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<UserProfile, StoreError>;
}
