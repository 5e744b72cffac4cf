use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceKey, AttendanceStatus, parse_lecture_date};
use crate::model::course::Course;
use crate::service::course::require_course;
use crate::store::{AttendanceStore, CourseDirectory, UpsertOutcome};

/// One `(student, status)` pair as it arrives on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkEntry {
    #[schema(example = 12)]
    pub student_id: u64,
    #[schema(example = "present")]
    pub status: String,
}

/// A batch that passed validation. Nothing has touched the store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkBatch {
    pub date: NaiveDate,
    pub entries: Vec<(u64, AttendanceStatus)>,
}

impl MarkBatch {
    pub fn parse(date: &str, records: &[MarkEntry]) -> Result<Self, AttendanceError> {
        if records.is_empty() {
            return Err(AttendanceError::Validation(
                "records must not be empty".into(),
            ));
        }

        let date = parse_lecture_date(date)?;
        let entries = records
            .iter()
            .map(|r| Ok((r.student_id, AttendanceStatus::parse(&r.status)?)))
            .collect::<Result<Vec<_>, AttendanceError>>()?;

        Ok(Self { date, entries })
    }

    pub fn student_ids(&self) -> Vec<u64> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkSummary {
    #[schema(example = 1)]
    pub course_id: u64,
    #[schema(value_type = String, format = "date", example = "2024-01-01")]
    pub date: NaiveDate,
    #[schema(example = 28)]
    pub inserted: usize,
    #[schema(example = 2)]
    pub updated: usize,
}

/// Looks the course up, then applies the batch.
pub async fn mark_attendance(
    store: &dyn AttendanceStore,
    courses: &dyn CourseDirectory,
    course_id: u64,
    batch: &MarkBatch,
) -> Result<MarkSummary, AttendanceError> {
    let course = require_course(courses, course_id).await?;
    apply_batch(store, courses, &course, batch).await
}

/// Upserts every entry of `batch` under `(course, student, date)`.
///
/// Each upsert is atomic on its own; the batch as a whole is not. Entries
/// are applied in order, so a student listed twice ends with the later
/// status. Replaying the same batch leaves the store unchanged.
#[instrument(
    name = "mark_attendance",
    skip(store, courses, course, batch),
    fields(course_id = course.id, date = %batch.date, records = batch.entries.len())
)]
pub async fn apply_batch(
    store: &dyn AttendanceStore,
    courses: &dyn CourseDirectory,
    course: &Course,
    batch: &MarkBatch,
) -> Result<MarkSummary, AttendanceError> {
    let missing = courses.missing_students(&batch.student_ids()).await?;
    if !missing.is_empty() {
        let ids = missing
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AttendanceError::NotFound(format!("Student not found: {ids}")));
    }

    let mut summary = MarkSummary {
        course_id: course.id,
        date: batch.date,
        inserted: 0,
        updated: 0,
    };

    for (applied, (student_id, status)) in batch.entries.iter().enumerate() {
        let key = AttendanceKey {
            course_id: course.id,
            student_id: *student_id,
            date: batch.date,
        };

        match store.upsert(key, *status).await {
            Ok(UpsertOutcome::Inserted) => summary.inserted += 1,
            Ok(UpsertOutcome::Updated) => summary.updated += 1,
            Err(source) => {
                error!(error = %source, student_id, applied, "Attendance upsert failed");
                return Err(AttendanceError::BatchInterrupted {
                    attempted: batch.entries.len(),
                    applied,
                    source,
                });
            }
        }
    }

    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        "Attendance marked"
    );

    Ok(summary)
}
