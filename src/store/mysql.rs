use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::MySqlPool;
use tracing::debug;

use super::{AttendanceStore, CourseDirectory, UpsertOutcome, UserStore};
use crate::error::StoreError;
use crate::model::attendance::{
    AttendanceKey, AttendanceStatus, CourseAttendanceEntry, DateRange, PresentTally,
    StudentAttendanceEntry,
};
use crate::model::course::Course;
use crate::model::student::StudentProfile;
use crate::model::user::{NewUser, NewUserKind, User, UserProfile};

/// MySQL backed store. The `attendance` table carries
/// `UNIQUE KEY (course_id, student_id, date)`; see `schema.sql`.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Appends `AND date >= ? / <= ?` for the bounded sides of `range`.
fn date_filter(range: &DateRange) -> (String, Vec<NaiveDate>) {
    let mut sql = String::new();
    let mut args = Vec::with_capacity(2);

    if let Some(from) = range.from {
        sql.push_str(" AND date >= ?");
        args.push(from);
    }
    if let Some(to) = range.to {
        sql.push_str(" AND date <= ?");
        args.push(to);
    }

    (sql, args)
}

/// `revision` always changes on the update path, so an update reports two
/// affected rows even when status and `updated_at` are unchanged and the
/// connection uses `CLIENT_FOUND_ROWS`.
const UPSERT_SQL: &str = r#"
    INSERT INTO attendance (course_id, student_id, date, status)
    VALUES (?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        status = VALUES(status),
        updated_at = CURRENT_TIMESTAMP(3),
        revision = revision + 1
"#;

/// MySQL reports 1 affected row for a fresh insert and 2 for an update.
fn upsert_outcome(rows_affected: u64) -> UpsertOutcome {
    if rows_affected == 1 {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::Updated
    }
}

const STUDENT_PROFILE_SELECT: &str = r#"
    SELECT s.id, s.enrollment_number, u.name, u.email
    FROM students s
    JOIN users u ON u.id = s.user_id
"#;

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn upsert(
        &self,
        key: AttendanceKey,
        status: AttendanceStatus,
    ) -> Result<UpsertOutcome, StoreError> {
        let result = sqlx::query(UPSERT_SQL)
            .bind(key.course_id)
            .bind(key.student_id)
            .bind(key.date)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(upsert_outcome(result.rows_affected()))
    }

    fn find_by_student(
        &self,
        student_id: u64,
    ) -> BoxStream<'_, Result<StudentAttendanceEntry, StoreError>> {
        sqlx::query_as::<_, StudentAttendanceEntry>(
            r#"
            SELECT
                a.course_id,
                c.title AS course_title,
                c.code AS course_code,
                a.date,
                CAST(a.status AS CHAR) AS status
            FROM attendance a
            JOIN courses c ON c.id = a.course_id
            WHERE a.student_id = ?
            ORDER BY a.date, a.course_id
            "#,
        )
        .bind(student_id)
        .fetch(&self.pool)
        .map(|row| row.map_err(StoreError::from))
        .boxed()
    }

    fn find_by_course(
        &self,
        course_id: u64,
    ) -> BoxStream<'_, Result<CourseAttendanceEntry, StoreError>> {
        sqlx::query_as::<_, CourseAttendanceEntry>(
            r#"
            SELECT
                a.student_id,
                s.enrollment_number,
                u.name AS student_name,
                a.date,
                CAST(a.status AS CHAR) AS status
            FROM attendance a
            JOIN students s ON s.id = a.student_id
            JOIN users u ON u.id = s.user_id
            WHERE a.course_id = ?
            ORDER BY a.date, a.student_id
            "#,
        )
        .bind(course_id)
        .fetch(&self.pool)
        .map(|row| row.map_err(StoreError::from))
        .boxed()
    }

    async fn distinct_dates(
        &self,
        course_id: u64,
        range: DateRange,
    ) -> Result<BTreeSet<NaiveDate>, StoreError> {
        let (filter, args) = date_filter(&range);
        let sql = format!(
            "SELECT DISTINCT date FROM attendance WHERE course_id = ?{}",
            filter
        );

        let mut q = sqlx::query_scalar::<_, NaiveDate>(&sql).bind(course_id);
        for arg in args {
            q = q.bind(arg);
        }

        let dates = q.fetch_all(&self.pool).await?;
        Ok(dates.into_iter().collect())
    }

    async fn count_by_status(
        &self,
        course_id: u64,
        student_id: u64,
        status: AttendanceStatus,
    ) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM attendance
            WHERE course_id = ? AND student_id = ? AND status = ?
            "#,
        )
        .bind(course_id)
        .bind(student_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn present_tallies(
        &self,
        course_id: u64,
        range: DateRange,
    ) -> Result<Vec<PresentTally>, StoreError> {
        let (filter, args) = date_filter(&range);
        let sql = format!(
            r#"
            SELECT
                student_id,
                CAST(SUM(status = 'present') AS SIGNED) AS present_count
            FROM attendance
            WHERE course_id = ?{}
            GROUP BY student_id
            ORDER BY student_id
            "#,
            filter
        );

        let mut q = sqlx::query_as::<_, PresentTally>(&sql).bind(course_id);
        for arg in args {
            q = q.bind(arg);
        }

        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn delete_all_for_course(&self, course_id: u64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM attendance WHERE course_id = ?")
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        debug!(course_id, deleted = result.rows_affected(), "Attendance cascade");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CourseDirectory for MySqlStore {
    async fn get(&self, course_id: u64) -> Result<Option<Course>, StoreError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, code, teacher_id, created_at
            FROM courses
            WHERE id = ?
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    async fn roster(&self, course_id: u64) -> Result<Vec<StudentProfile>, StoreError> {
        let sql = format!(
            "{} JOIN course_students cs ON cs.student_id = s.id WHERE cs.course_id = ? ORDER BY s.id",
            STUDENT_PROFILE_SELECT
        );

        let students = sqlx::query_as::<_, StudentProfile>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(students)
    }

    async fn student(&self, student_id: u64) -> Result<Option<StudentProfile>, StoreError> {
        let sql = format!("{} WHERE s.id = ?", STUDENT_PROFILE_SELECT);

        let student = sqlx::query_as::<_, StudentProfile>(&sql)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(student)
    }

    async fn missing_students(&self, student_ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let wanted: BTreeSet<u64> = student_ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; wanted.len()].join(", ");
        let sql = format!("SELECT id FROM students WHERE id IN ({})", placeholders);

        let mut q = sqlx::query_scalar::<_, u64>(&sql);
        for id in &wanted {
            q = q.bind(*id);
        }

        let found: HashSet<u64> = q.fetch_all(&self.pool).await?.into_iter().collect();
        Ok(wanted.into_iter().filter(|id| !found.contains(id)).collect())
    }

    async fn create_course(&self, title: &str, code: &str) -> Result<Course, StoreError> {
        let result = sqlx::query("INSERT INTO courses (title, code) VALUES (?, ?)")
            .bind(title)
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, "Course code"))?;

        let id = result.last_insert_id();
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("course {id} vanished after insert")))
    }

    async fn assign_teacher(&self, course_id: u64, teacher_id: u64) -> Result<(), StoreError> {
        sqlx::query("UPDATE courses SET teacher_id = ? WHERE id = ?")
            .bind(teacher_id)
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn teacher_exists(&self, teacher_id: u64) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM teachers WHERE id = ? LIMIT 1)",
        )
        .bind(teacher_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn enroll(&self, course_id: u64, student_id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT IGNORE INTO course_students (course_id, student_id) VALUES (?, ?)",
        )
        .bind(course_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn unenroll(&self, course_id: u64, student_id: u64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM course_students WHERE course_id = ? AND student_id = ?")
                .bind(course_id)
                .bind(student_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_course(&self, course_id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, role_id, teacher_id, student_id
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn profile(&self, user_id: u64) -> Result<Option<UserProfile>, StoreError> {
        let user = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, name, email, role_id, teacher_id, student_id
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn record_login(&self, user_id: u64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, StoreError> {
        let role = user.kind.role();
        let mut tx = self.pool.begin().await?;

        let user_id =
            sqlx::query("INSERT INTO users (name, email, password, role_id) VALUES (?, ?, ?, ?)")
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(role.id())
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::from_insert(e, "User"))?
                .last_insert_id();

        let (mut teacher_id, mut student_id) = (None, None);
        match &user.kind {
            NewUserKind::Admin => {}
            NewUserKind::Teacher { department } => {
                let id = sqlx::query("INSERT INTO teachers (user_id, department) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(department)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_id();

                sqlx::query("UPDATE users SET teacher_id = ? WHERE id = ?")
                    .bind(id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                teacher_id = Some(id);
            }
            NewUserKind::Student { enrollment_number } => {
                let id = sqlx::query(
                    "INSERT INTO students (user_id, enrollment_number) VALUES (?, ?)",
                )
                .bind(user_id)
                .bind(enrollment_number)
                .execute(&mut *tx)
                .await?
                .last_insert_id();

                sqlx::query("UPDATE users SET student_id = ? WHERE id = ?")
                    .bind(id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                student_id = Some(id);
            }
        }

        tx.commit().await?;
        debug!(user_id, %role, "User inserted");

        Ok(UserProfile {
            id: user_id,
            name: user.name,
            email: user.email,
            role_id: role.id(),
            teacher_id,
            student_id,
        })
    }
}
