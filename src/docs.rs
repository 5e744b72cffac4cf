use crate::api::attendance::{
    CourseRecordsResponse, MarkRequest, MarkResponse, ReportRequest, StudentRecordsResponse,
};
use crate::api::course::{CourseResponse, CreateCourse};
use crate::api::user::UserResponse;
use crate::model::attendance::{AttendanceStatus, CourseAttendanceEntry, StudentAttendanceEntry};
use crate::model::course::Course;
use crate::model::student::StudentProfile;
use crate::model::user::UserProfile;
use crate::service::marking::{MarkEntry, MarkSummary};
use crate::service::user::CreateUserRequest;
use crate::service::report::{
    AttendanceReport, RosterCourse, RosterStudent, RosterSummary, StudentPercentage,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

pub struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Course Attendance Tracking

Backend for recording per-lecture attendance and reporting attendance percentages.

### 🔹 Key Features
- **Attendance Marking**
  - Teachers mark a whole lecture at once; re-submitting overwrites, never duplicates
- **Attendance Reports**
  - Percentages per student over an optional date range, with a minimum-percentage filter
- **Course Rosters**
  - Enrollment management and a roster-wide attendance summary

### 🔐 Security
Endpoints are protected using **JWT Bearer authentication**.
Marking is limited to the course's teacher; reports to **Teacher** or **Admin**.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::mark_attendance,
        crate::api::attendance::student_attendance,
        crate::api::attendance::course_attendance,
        crate::api::attendance::attendance_report,

        crate::api::course::create_course,
        crate::api::course::assign_teacher,
        crate::api::course::enroll_student,
        crate::api::course::unenroll_student,
        crate::api::course::delete_course,
        crate::api::course::roster_summary,

        crate::api::user::create_user,
        crate::auth::handlers::profile
    ),
    components(
        schemas(
            AttendanceStatus,
            MarkEntry,
            MarkRequest,
            MarkResponse,
            MarkSummary,
            ReportRequest,
            AttendanceReport,
            StudentPercentage,
            StudentAttendanceEntry,
            CourseAttendanceEntry,
            StudentRecordsResponse,
            CourseRecordsResponse,
            Course,
            CreateCourse,
            CourseResponse,
            RosterCourse,
            RosterStudent,
            RosterSummary,
            StudentProfile,
            CreateUserRequest,
            UserResponse,
            UserProfile
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Attendance", description = "Attendance marking and reporting APIs"),
        (name = "Course", description = "Course and enrollment APIs"),
        (name = "User", description = "Account and current user APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_attendance_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/api/attendance/mark"));
        assert!(paths.contains_key("/api/attendance/report"));
        assert!(paths.contains_key("/api/courses/{course_id}/students"));
        assert!(paths.contains_key("/api/users"));
        assert!(doc.components.as_ref().is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
