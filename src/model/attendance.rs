use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::AttendanceError;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }

    /// Parses a wire value. Only the exact lowercase names are accepted.
    pub fn parse(value: &str) -> Result<Self, AttendanceError> {
        value.parse().map_err(|_| {
            AttendanceError::Validation(format!(
                "Invalid status '{value}'. Allowed: present, absent"
            ))
        })
    }
}

/// Unique key of an attendance mark. A lecture is identified by its date.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttendanceKey {
    pub course_id: u64,
    pub student_id: u64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub course_id: u64,
    pub student_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl AttendanceRecord {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey {
            course_id: self.course_id,
            student_id: self.student_id,
            date: self.date,
        }
    }
}

/// Inclusive bounds on lecture dates. Either side may be open.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub const ALL: DateRange = DateRange { from: None, to: None };

    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, AttendanceError> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(AttendanceError::Validation(
                    "fromDate cannot be after toDate".into(),
                ));
            }
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|f| date >= f) && self.to.is_none_or(|t| date <= t)
    }
}

/// Normalizes an inbound date to the calendar date it names.
///
/// Accepts `2024-01-01`, `2024-01-01T09:30:00` (optionally with fractional
/// seconds) and RFC 3339 timestamps. The time-of-day and any offset are
/// dropped; the date is taken as written.
pub fn parse_lecture_date(value: &str) -> Result<NaiveDate, AttendanceError> {
    let value = value.trim();

    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }

    Err(AttendanceError::Validation(format!(
        "Malformed date '{value}'"
    )))
}

/// A student's attendance row enriched with the owning course.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceEntry {
    pub course_id: u64,
    pub course_title: String,
    pub course_code: String,
    #[schema(value_type = String, format = "date", example = "2024-01-01")]
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
}

/// A course's attendance row enriched with the student it belongs to.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CourseAttendanceEntry {
    pub student_id: u64,
    pub enrollment_number: String,
    pub student_name: String,
    #[schema(value_type = String, format = "date", example = "2024-01-01")]
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
}

/// Present count for one student over a date range.
#[derive(Debug, Copy, Clone, Eq, PartialEq, sqlx::FromRow)]
pub struct PresentTally {
    pub student_id: u64,
    pub present_count: i64,
}
