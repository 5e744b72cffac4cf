use crate::auth::{auth::AuthUser, capability::Operation};
use crate::error::AttendanceError;
use crate::model::attendance::{
    CourseAttendanceEntry, DateRange, StudentAttendanceEntry, parse_lecture_date,
};
use crate::service::course::require_course;
use crate::service::marking::{MarkBatch, MarkEntry, MarkSummary, apply_batch};
use crate::service::report::{build_report, filter_by_min_percentage};
use crate::store::{AttendanceStore, CourseDirectory};
use actix_web::{HttpResponse, Responder, web};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    #[schema(example = 1)]
    pub course_id: u64,
    /// Lecture date; any time-of-day part is dropped
    #[schema(example = "2024-01-01")]
    pub date: String,
    pub records: Vec<MarkEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct MarkResponse {
    #[schema(example = "Attendance marked successfully")]
    pub msg: String,
    pub result: MarkSummary,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[schema(example = 1)]
    pub course_id: u64,
    #[schema(example = "2024-01-01", nullable = true)]
    pub from_date: Option<String>,
    #[schema(example = "2024-01-31", nullable = true)]
    pub to_date: Option<String>,
    #[schema(example = 75.0, nullable = true)]
    pub min_percentage: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct StudentRecordsResponse {
    pub records: Vec<StudentAttendanceEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct CourseRecordsResponse {
    pub records: Vec<CourseAttendanceEntry>,
}

fn parse_optional_date(value: Option<&str>) -> Result<Option<chrono::NaiveDate>, AttendanceError> {
    value.map(parse_lecture_date).transpose()
}

/// Mark attendance for a course lecture (course teacher only)
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body(
        content = MarkRequest,
        description = "Per-student statuses for one lecture date",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Attendance marked", body = MarkResponse),
        (status = 400, description = "Empty batch, unknown status or malformed date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course or student not found"),
        (status = 500, description = "Batch interrupted; safe to resubmit", body = Object, example = json!({
            "message": "Attendance batch interrupted, resubmit to complete",
            "attempted": 30,
            "applied": 12
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    courses: web::Data<dyn CourseDirectory>,
    payload: web::Json<MarkRequest>,
) -> actix_web::Result<impl Responder> {
    auth.authorize_role(Operation::MarkAttendance)?;
    let course = require_course(courses.get_ref(), payload.course_id).await?;
    auth.authorize(Operation::MarkAttendance, Some(&course))?;

    let batch = MarkBatch::parse(&payload.date, &payload.records)?;
    let summary = apply_batch(store.get_ref(), courses.get_ref(), &course, &batch).await?;

    Ok(HttpResponse::Ok().json(MarkResponse {
        msg: "Attendance marked successfully".into(),
        result: summary,
    }))
}

/// Attendance records of a student, with course title and code
#[utoipa::path(
    get,
    path = "/api/attendance/student/{student_id}",
    params(
        ("student_id" = u64, Path, description = "Student id")
    ),
    responses(
        (status = 200, description = "Records of the student", body = StudentRecordsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn student_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::FindByStudent, None)?;

    let student_id = path.into_inner();
    let records: Vec<_> = store
        .find_by_student(student_id)
        .try_collect()
        .await
        .map_err(AttendanceError::from)?;

    Ok(HttpResponse::Ok().json(StudentRecordsResponse { records }))
}

/// Attendance records of a course, with student identity
#[utoipa::path(
    get,
    path = "/api/attendance/course/{course_id}",
    params(
        ("course_id" = u64, Path, description = "Course id")
    ),
    responses(
        (status = 200, description = "Records of the course", body = CourseRecordsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn course_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::FindByCourse, None)?;

    let course_id = path.into_inner();
    let records: Vec<_> = store
        .find_by_course(course_id)
        .try_collect()
        .await
        .map_err(AttendanceError::from)?;

    Ok(HttpResponse::Ok().json(CourseRecordsResponse { records }))
}

/// Attendance percentages for a course, optionally bounded by dates and
/// narrowed by a minimum percentage (teacher or admin)
#[utoipa::path(
    post,
    path = "/api/attendance/report",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Attendance report", body = AttendanceReport, example = json!({
            "totalLectures": 3,
            "report": [
                { "studentId": 12, "presentCount": 2, "total": 3, "percentage": 66.67 }
            ]
        })),
        (status = 400, description = "Malformed date or inverted range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_report(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    courses: web::Data<dyn CourseDirectory>,
    payload: web::Json<ReportRequest>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::BuildReport, None)?;

    let range = DateRange::new(
        parse_optional_date(payload.from_date.as_deref())?,
        parse_optional_date(payload.to_date.as_deref())?,
    )?;

    let report = build_report(store.get_ref(), courses.get_ref(), payload.course_id, range).await?;
    let report = filter_by_min_percentage(report, payload.min_percentage);

    Ok(HttpResponse::Ok().json(report))
}
