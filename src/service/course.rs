use tracing::{info, instrument};

use crate::error::AttendanceError;
use crate::model::course::Course;
use crate::store::{AttendanceStore, CourseDirectory};

pub async fn require_course(
    courses: &dyn CourseDirectory,
    course_id: u64,
) -> Result<Course, AttendanceError> {
    courses
        .get(course_id)
        .await?
        .ok_or_else(|| AttendanceError::NotFound("Course not found".into()))
}

async fn require_student(
    courses: &dyn CourseDirectory,
    student_id: u64,
) -> Result<(), AttendanceError> {
    match courses.student(student_id).await? {
        Some(_) => Ok(()),
        None => Err(AttendanceError::NotFound("Student not found".into())),
    }
}

#[instrument(skip(courses), err)]
pub async fn create_course(
    courses: &dyn CourseDirectory,
    title: &str,
    code: &str,
) -> Result<Course, AttendanceError> {
    let title = title.trim();
    let code = code.trim();
    if title.is_empty() || code.is_empty() {
        return Err(AttendanceError::Validation(
            "title and code must not be empty".into(),
        ));
    }

    let course = courses.create_course(title, code).await?;
    info!(course_id = course.id, "Course created");
    Ok(course)
}

#[instrument(skip(courses), err)]
pub async fn assign_teacher(
    courses: &dyn CourseDirectory,
    course_id: u64,
    teacher_id: u64,
) -> Result<(), AttendanceError> {
    require_course(courses, course_id).await?;
    if !courses.teacher_exists(teacher_id).await? {
        return Err(AttendanceError::NotFound("Teacher not found".into()));
    }

    courses.assign_teacher(course_id, teacher_id).await?;
    Ok(())
}

/// Idempotent; returns false when the student was already enrolled.
#[instrument(skip(courses), err)]
pub async fn enroll_student(
    courses: &dyn CourseDirectory,
    course_id: u64,
    student_id: u64,
) -> Result<bool, AttendanceError> {
    require_course(courses, course_id).await?;
    require_student(courses, student_id).await?;
    Ok(courses.enroll(course_id, student_id).await?)
}

/// Idempotent; the student's attendance history is kept.
#[instrument(skip(courses), err)]
pub async fn unenroll_student(
    courses: &dyn CourseDirectory,
    course_id: u64,
    student_id: u64,
) -> Result<bool, AttendanceError> {
    if !courses.exists(course_id).await? {
        return Err(AttendanceError::NotFound("Course not found".into()));
    }
    Ok(courses.unenroll(course_id, student_id).await?)
}

/// Removes the course together with all of its attendance marks.
#[instrument(skip(store, courses), err)]
pub async fn delete_course(
    store: &dyn AttendanceStore,
    courses: &dyn CourseDirectory,
    course_id: u64,
) -> Result<Course, AttendanceError> {
    let course = require_course(courses, course_id).await?;

    let deleted = store.delete_all_for_course(course_id).await?;
    courses.delete_course(course_id).await?;

    info!(course_id, attendance_deleted = deleted, "Course deleted");
    Ok(course)
}
