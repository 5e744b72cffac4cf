#![allow(dead_code)]

use attendance::model::course::Course;
use attendance::model::student::StudentProfile;
use attendance::service::course;
use attendance::service::marking::{MarkBatch, MarkEntry};
use attendance::store::MemoryStore;
use chrono::NaiveDate;

pub const TEACHER_ID: u64 = 10;

pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

pub fn student(id: u64) -> StudentProfile {
    StudentProfile {
        id,
        enrollment_number: format!("ENR-{id:03}"),
        name: format!("Student {id}"),
        email: format!("s{id}@school.edu"),
    }
}

pub fn entries(records: &[(u64, &str)]) -> Vec<MarkEntry> {
    records
        .iter()
        .map(|(student_id, status)| MarkEntry {
            student_id: *student_id,
            status: status.to_string(),
        })
        .collect()
}

pub fn batch(date: &str, records: &[(u64, &str)]) -> MarkBatch {
    MarkBatch::parse(date, &entries(records)).unwrap()
}

/// Store with students 1..=3 enrolled in one course taught by `TEACHER_ID`.
pub async fn seeded() -> (MemoryStore, Course) {
    let store = MemoryStore::new();
    store.add_teacher(TEACHER_ID).unwrap();
    for id in 1..=3 {
        store.add_student(student(id)).unwrap();
    }

    let created = course::create_course(&store, "Networks", "CS-220").await.unwrap();
    course::assign_teacher(&store, created.id, TEACHER_ID).await.unwrap();
    for id in 1..=3 {
        course::enroll_student(&store, created.id, id).await.unwrap();
    }

    let created = course::require_course(&store, created.id).await.unwrap();
    (store, created)
}
