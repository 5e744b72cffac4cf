use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::StreamExt;
use futures::stream::{self, BoxStream};

use super::{AttendanceStore, CourseDirectory, UpsertOutcome, UserStore};
use crate::error::StoreError;
use crate::model::attendance::{
    AttendanceKey, AttendanceRecord, AttendanceStatus, CourseAttendanceEntry, DateRange,
    PresentTally, StudentAttendanceEntry,
};
use crate::model::course::Course;
use crate::model::student::StudentProfile;
use crate::model::user::{NewUser, NewUserKind, User, UserProfile};

#[derive(Debug, Default)]
struct Directory {
    courses: BTreeMap<u64, Course>,
    students: BTreeMap<u64, StudentProfile>,
    teachers: BTreeSet<u64>,
    enrollments: BTreeMap<u64, BTreeSet<u64>>,
    users: BTreeMap<u64, User>,
    next_course_id: u64,
}

fn next_id<'a>(mut ids: impl DoubleEndedIterator<Item = &'a u64>) -> u64 {
    ids.next_back().map_or(1, |id| id + 1)
}

/// Process-local store. Each upsert runs inside one write-lock section,
/// which gives the same per-key atomicity as the MySQL unique index.
#[derive(Debug, Default)]
pub struct MemoryStore {
    attendance: RwLock<HashMap<AttendanceKey, AttendanceRecord>>,
    directory: RwLock<Directory>,
}

fn poisoned(what: &str) -> StoreError {
    StoreError::Unavailable(format!("{what} lock poisoned"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn attendance(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<AttendanceKey, AttendanceRecord>>, StoreError> {
        self.attendance.read().map_err(|_| poisoned("attendance"))
    }

    fn attendance_mut(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<AttendanceKey, AttendanceRecord>>, StoreError> {
        self.attendance.write().map_err(|_| poisoned("attendance"))
    }

    fn directory(&self) -> Result<RwLockReadGuard<'_, Directory>, StoreError> {
        self.directory.read().map_err(|_| poisoned("directory"))
    }

    fn directory_mut(&self) -> Result<RwLockWriteGuard<'_, Directory>, StoreError> {
        self.directory.write().map_err(|_| poisoned("directory"))
    }

    /// Registers a student profile, replacing any profile with the same id.
    pub fn add_student(&self, student: StudentProfile) -> Result<(), StoreError> {
        self.directory_mut()?.students.insert(student.id, student);
        Ok(())
    }

    pub fn add_teacher(&self, teacher_id: u64) -> Result<(), StoreError> {
        self.directory_mut()?.teachers.insert(teacher_id);
        Ok(())
    }

    /// Snapshot of every stored mark, ordered by key.
    pub fn records(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records: Vec<_> = self.attendance()?.values().cloned().collect();
        records.sort_by_key(|r| (r.course_id, r.student_id, r.date));
        Ok(records)
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn upsert(
        &self,
        key: AttendanceKey,
        status: AttendanceStatus,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut attendance = self.attendance_mut()?;
        let now = Utc::now();

        match attendance.entry(key) {
            Entry::Occupied(mut existing) => {
                let record = existing.get_mut();
                record.status = status;
                record.updated_at = now;
                Ok(UpsertOutcome::Updated)
            }
            Entry::Vacant(slot) => {
                slot.insert(AttendanceRecord {
                    course_id: key.course_id,
                    student_id: key.student_id,
                    date: key.date,
                    status,
                    created_at: now,
                    updated_at: now,
                });
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    fn find_by_student(
        &self,
        student_id: u64,
    ) -> BoxStream<'_, Result<StudentAttendanceEntry, StoreError>> {
        let entries = self.attendance().and_then(|attendance| {
            let directory = self.directory()?;
            let mut entries: Vec<_> = attendance
                .values()
                .filter(|r| r.student_id == student_id)
                .filter_map(|r| {
                    let course = directory.courses.get(&r.course_id)?;
                    Some(StudentAttendanceEntry {
                        course_id: r.course_id,
                        course_title: course.title.clone(),
                        course_code: course.code.clone(),
                        date: r.date,
                        status: r.status,
                    })
                })
                .collect();
            entries.sort_by_key(|e| (e.date, e.course_id));
            Ok(entries)
        });

        match entries {
            Ok(entries) => stream::iter(entries.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    fn find_by_course(
        &self,
        course_id: u64,
    ) -> BoxStream<'_, Result<CourseAttendanceEntry, StoreError>> {
        let entries = self.attendance().and_then(|attendance| {
            let directory = self.directory()?;
            let mut entries: Vec<_> = attendance
                .values()
                .filter(|r| r.course_id == course_id)
                .filter_map(|r| {
                    let student = directory.students.get(&r.student_id)?;
                    Some(CourseAttendanceEntry {
                        student_id: r.student_id,
                        enrollment_number: student.enrollment_number.clone(),
                        student_name: student.name.clone(),
                        date: r.date,
                        status: r.status,
                    })
                })
                .collect();
            entries.sort_by_key(|e| (e.date, e.student_id));
            Ok(entries)
        });

        match entries {
            Ok(entries) => stream::iter(entries.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    async fn distinct_dates(
        &self,
        course_id: u64,
        range: DateRange,
    ) -> Result<BTreeSet<NaiveDate>, StoreError> {
        Ok(self
            .attendance()?
            .keys()
            .filter(|k| k.course_id == course_id && range.contains(k.date))
            .map(|k| k.date)
            .collect())
    }

    async fn count_by_status(
        &self,
        course_id: u64,
        student_id: u64,
        status: AttendanceStatus,
    ) -> Result<i64, StoreError> {
        let count = self
            .attendance()?
            .values()
            .filter(|r| r.course_id == course_id && r.student_id == student_id && r.status == status)
            .count();

        Ok(count as i64)
    }

    async fn present_tallies(
        &self,
        course_id: u64,
        range: DateRange,
    ) -> Result<Vec<PresentTally>, StoreError> {
        let mut tallies: BTreeMap<u64, i64> = BTreeMap::new();

        for r in self.attendance()?.values() {
            if r.course_id != course_id || !range.contains(r.date) {
                continue;
            }
            let present = tallies.entry(r.student_id).or_default();
            if r.status == AttendanceStatus::Present {
                *present += 1;
            }
        }

        Ok(tallies
            .into_iter()
            .map(|(student_id, present_count)| PresentTally {
                student_id,
                present_count,
            })
            .collect())
    }

    async fn delete_all_for_course(&self, course_id: u64) -> Result<u64, StoreError> {
        let mut attendance = self.attendance_mut()?;
        let before = attendance.len();
        attendance.retain(|k, _| k.course_id != course_id);
        Ok((before - attendance.len()) as u64)
    }
}

#[async_trait]
impl CourseDirectory for MemoryStore {
    async fn get(&self, course_id: u64) -> Result<Option<Course>, StoreError> {
        Ok(self.directory()?.courses.get(&course_id).cloned())
    }

    async fn roster(&self, course_id: u64) -> Result<Vec<StudentProfile>, StoreError> {
        let directory = self.directory()?;
        let Some(enrolled) = directory.enrollments.get(&course_id) else {
            return Ok(Vec::new());
        };

        Ok(enrolled
            .iter()
            .filter_map(|id| directory.students.get(id).cloned())
            .collect())
    }

    async fn student(&self, student_id: u64) -> Result<Option<StudentProfile>, StoreError> {
        Ok(self.directory()?.students.get(&student_id).cloned())
    }

    async fn missing_students(&self, student_ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let directory = self.directory()?;
        let wanted: BTreeSet<u64> = student_ids.iter().copied().collect();

        Ok(wanted
            .into_iter()
            .filter(|id| !directory.students.contains_key(id))
            .collect())
    }

    async fn create_course(&self, title: &str, code: &str) -> Result<Course, StoreError> {
        let mut directory = self.directory_mut()?;
        if directory.courses.values().any(|c| c.code == code) {
            return Err(StoreError::Conflict("Course code already exists".into()));
        }

        directory.next_course_id += 1;
        let course = Course {
            id: directory.next_course_id,
            title: title.to_string(),
            code: code.to_string(),
            teacher_id: None,
            created_at: Utc::now(),
        };
        directory.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn assign_teacher(&self, course_id: u64, teacher_id: u64) -> Result<(), StoreError> {
        if let Some(course) = self.directory_mut()?.courses.get_mut(&course_id) {
            course.teacher_id = Some(teacher_id);
        }
        Ok(())
    }

    async fn teacher_exists(&self, teacher_id: u64) -> Result<bool, StoreError> {
        Ok(self.directory()?.teachers.contains(&teacher_id))
    }

    async fn enroll(&self, course_id: u64, student_id: u64) -> Result<bool, StoreError> {
        Ok(self
            .directory_mut()?
            .enrollments
            .entry(course_id)
            .or_default()
            .insert(student_id))
    }

    async fn unenroll(&self, course_id: u64, student_id: u64) -> Result<bool, StoreError> {
        Ok(self
            .directory_mut()?
            .enrollments
            .get_mut(&course_id)
            .is_some_and(|enrolled| enrolled.remove(&student_id)))
    }

    async fn delete_course(&self, course_id: u64) -> Result<bool, StoreError> {
        let mut directory = self.directory_mut()?;
        directory.enrollments.remove(&course_id);
        Ok(directory.courses.remove(&course_id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .directory()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn profile(&self, user_id: u64) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.directory()?.users.get(&user_id).map(User::profile))
    }

    // Login times are not kept in memory.
    async fn record_login(&self, _user_id: u64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, StoreError> {
        let mut directory = self.directory_mut()?;
        if directory.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("User already exists".into()));
        }

        let id = next_id(directory.users.keys());
        let (mut teacher_id, mut student_id) = (None, None);
        match &user.kind {
            NewUserKind::Admin => {}
            NewUserKind::Teacher { .. } => {
                let teacher = next_id(directory.teachers.iter());
                directory.teachers.insert(teacher);
                teacher_id = Some(teacher);
            }
            NewUserKind::Student { enrollment_number } => {
                let student = next_id(directory.students.keys());
                directory.students.insert(
                    student,
                    StudentProfile {
                        id: student,
                        enrollment_number: enrollment_number.clone(),
                        name: user.name.clone(),
                        email: user.email.clone(),
                    },
                );
                student_id = Some(student);
            }
        }

        let created = User {
            id,
            name: user.name,
            email: user.email,
            password: user.password_hash,
            role_id: user.kind.role().id(),
            teacher_id,
            student_id,
        };
        let profile = created.profile();
        directory.users.insert(id, created);
        Ok(profile)
    }
}
