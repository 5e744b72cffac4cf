use crate::auth::{auth::AuthUser, capability::Operation};
use crate::model::course::Course;
use crate::service::course;
use crate::service::report::build_roster_summary;
use crate::store::{AttendanceStore, CourseDirectory};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateCourse {
    #[schema(example = "Operating Systems")]
    pub title: String,
    #[schema(example = "CS-301")]
    pub code: String,
}

#[derive(Serialize, ToSchema)]
pub struct CourseResponse {
    #[schema(example = "Course created")]
    pub msg: String,
    pub course: Course,
}

/// Create a course (teacher or admin)
#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourse,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Missing title or code"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Course code already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Course"
)]
pub async fn create_course(
    auth: AuthUser,
    courses: web::Data<dyn CourseDirectory>,
    payload: web::Json<CreateCourse>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::CreateCourse, None)?;

    let course = course::create_course(courses.get_ref(), &payload.title, &payload.code).await?;

    Ok(HttpResponse::Created().json(CourseResponse {
        msg: "Course created".into(),
        course,
    }))
}

/// Assign a teacher to a course (admin only)
#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/teacher/{teacher_id}",
    params(
        ("course_id" = u64, Path, description = "Course id"),
        ("teacher_id" = u64, Path, description = "Teacher id")
    ),
    responses(
        (status = 200, description = "Teacher assigned", body = Object, example = json!({
            "msg": "Teacher assigned"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course or teacher not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Course"
)]
pub async fn assign_teacher(
    auth: AuthUser,
    courses: web::Data<dyn CourseDirectory>,
    path: web::Path<(u64, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::AssignTeacher, None)?;

    let (course_id, teacher_id) = path.into_inner();
    course::assign_teacher(courses.get_ref(), course_id, teacher_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "msg": "Teacher assigned" })))
}

/// Enroll a student in a course (teacher or admin)
#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/students/{student_id}",
    params(
        ("course_id" = u64, Path, description = "Course id"),
        ("student_id" = u64, Path, description = "Student id")
    ),
    responses(
        (status = 200, description = "Student enrolled", body = Object, example = json!({
            "msg": "Student enrolled successfully",
            "enrolled": true
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course or student not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Course"
)]
pub async fn enroll_student(
    auth: AuthUser,
    courses: web::Data<dyn CourseDirectory>,
    path: web::Path<(u64, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::EnrollStudent, None)?;

    let (course_id, student_id) = path.into_inner();
    let enrolled = course::enroll_student(courses.get_ref(), course_id, student_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "msg": "Student enrolled successfully",
        "enrolled": enrolled
    })))
}

/// Remove a student from a course (admin only). Attendance history stays.
#[utoipa::path(
    delete,
    path = "/api/courses/{course_id}/students/{student_id}",
    params(
        ("course_id" = u64, Path, description = "Course id"),
        ("student_id" = u64, Path, description = "Student id")
    ),
    responses(
        (status = 200, description = "Student removed", body = Object, example = json!({
            "msg": "Student removed from course",
            "removed": true
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Course"
)]
pub async fn unenroll_student(
    auth: AuthUser,
    courses: web::Data<dyn CourseDirectory>,
    path: web::Path<(u64, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::UnenrollStudent, None)?;

    let (course_id, student_id) = path.into_inner();
    let removed = course::unenroll_student(courses.get_ref(), course_id, student_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "msg": "Student removed from course",
        "removed": removed
    })))
}

/// Delete a course and all of its attendance records (admin only)
#[utoipa::path(
    delete,
    path = "/api/courses/{course_id}",
    params(
        ("course_id" = u64, Path, description = "Course id")
    ),
    responses(
        (status = 200, description = "Course deleted", body = CourseResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Course"
)]
pub async fn delete_course(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    courses: web::Data<dyn CourseDirectory>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::DeleteCourse, None)?;

    let deleted = course::delete_course(store.get_ref(), courses.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(CourseResponse {
        msg: "Course Deleted".into(),
        course: deleted,
    }))
}

/// Every enrolled student with present count and a display percentage
#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/students",
    params(
        ("course_id" = u64, Path, description = "Course id")
    ),
    responses(
        (status = 200, description = "Roster attendance summary", body = RosterSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Course"
)]
pub async fn roster_summary(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    courses: web::Data<dyn CourseDirectory>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::RosterSummary, None)?;

    let summary = build_roster_summary(store.get_ref(), courses.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(summary))
}
