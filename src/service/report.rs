use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceStatus, DateRange};
use crate::service::course::require_course;
use crate::store::{AttendanceStore, CourseDirectory};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentPercentage {
    #[schema(example = 12)]
    pub student_id: u64,
    #[schema(example = 2)]
    pub present_count: i64,
    #[schema(example = 3)]
    pub total: i64,
    #[schema(example = 66.67)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    #[schema(example = 3)]
    pub total_lectures: i64,
    pub report: Vec<StudentPercentage>,
}

/// `present / total * 100`, zero when no lectures were held.
///
/// Reads are not isolated from concurrent marking, so `present` can briefly
/// exceed `total`; the result is clamped to `[0, 100]`.
pub fn percentage(present: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (present as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-student percentages over the lectures held in `range`.
///
/// Only students with at least one mark in range appear; enrolled students
/// without marks are left out. `build_roster_summary` is the roster view.
#[instrument(skip(store, courses), err)]
pub async fn build_report(
    store: &dyn AttendanceStore,
    courses: &dyn CourseDirectory,
    course_id: u64,
    range: DateRange,
) -> Result<AttendanceReport, AttendanceError> {
    require_course(courses, course_id).await?;

    let total_lectures = store.distinct_dates(course_id, range).await?.len() as i64;
    let tallies = store.present_tallies(course_id, range).await?;

    let mut report: Vec<StudentPercentage> = tallies
        .into_iter()
        .map(|t| StudentPercentage {
            student_id: t.student_id,
            present_count: t.present_count,
            total: total_lectures,
            percentage: round2(percentage(t.present_count, total_lectures)),
        })
        .collect();
    report.sort_by_key(|s| s.student_id);

    debug!(total_lectures, students = report.len(), "Report built");

    Ok(AttendanceReport {
        total_lectures,
        report,
    })
}

/// Keeps entries with `percentage >= min`. `None` passes the report through.
/// The lecture total is never touched.
pub fn filter_by_min_percentage(mut report: AttendanceReport, min: Option<f64>) -> AttendanceReport {
    if let Some(min) = min {
        report.report.retain(|s| s.percentage >= min);
    }
    report
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterCourse {
    pub id: u64,
    pub title: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterStudent {
    pub student_id: u64,
    pub enrollment_number: String,
    pub name: String,
    pub email: String,
    pub present_count: i64,
    pub total_lectures: i64,
    /// Two decimal display string, `"0.00"` when no lectures were held.
    #[schema(example = "66.67")]
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub course: RosterCourse,
    pub students: Vec<RosterStudent>,
}

/// Attendance summary for every enrolled student, marked or not, over all
/// lectures of the course.
#[instrument(skip(store, courses), err)]
pub async fn build_roster_summary(
    store: &dyn AttendanceStore,
    courses: &dyn CourseDirectory,
    course_id: u64,
) -> Result<RosterSummary, AttendanceError> {
    let course = require_course(courses, course_id).await?;
    let roster = courses.roster(course_id).await?;
    let total_lectures = store.distinct_dates(course_id, DateRange::ALL).await?.len() as i64;

    let students = try_join_all(roster.into_iter().map(|student| async move {
        let present_count = store
            .count_by_status(course_id, student.id, AttendanceStatus::Present)
            .await?;

        Ok::<_, AttendanceError>(RosterStudent {
            student_id: student.id,
            enrollment_number: student.enrollment_number,
            name: student.name,
            email: student.email,
            present_count,
            total_lectures,
            percentage: format!("{:.2}", percentage(present_count, total_lectures)),
        })
    }))
    .await?;

    Ok(RosterSummary {
        course: RosterCourse {
            id: course.id,
            title: course.title,
            code: course.code,
        },
        students,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(student_id: u64, percentage: f64) -> StudentPercentage {
        StudentPercentage {
            student_id,
            present_count: 0,
            total: 10,
            percentage,
        }
    }

    #[test]
    fn zero_lectures_is_zero_percent() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn percentage_is_bounded() {
        assert_eq!(percentage(3, 3), 100.0);
        assert_eq!(percentage(4, 3), 100.0);
        assert_eq!(round2(percentage(2, 3)), 66.67);
        assert_eq!(round2(percentage(1, 3)), 33.33);
    }

    #[test]
    fn filter_keeps_entries_at_or_above_threshold() {
        let report = AttendanceReport {
            total_lectures: 10,
            report: vec![row(1, 69.99), row(2, 70.0), row(3, 100.0)],
        };

        let filtered = filter_by_min_percentage(report, Some(70.0));
        assert_eq!(filtered.total_lectures, 10);
        assert_eq!(
            filtered.report.iter().map(|s| s.student_id).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn missing_threshold_passes_through() {
        let report = AttendanceReport {
            total_lectures: 4,
            report: vec![row(1, 0.0), row(2, 25.0)],
        };
        assert_eq!(filter_by_min_percentage(report.clone(), None), report);
    }
}
