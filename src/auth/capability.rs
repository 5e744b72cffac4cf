use crate::model::course::Course;
use crate::model::role::Role;

/// What the caller must hold before an operation runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    /// Any valid identity.
    Authenticated,
    TeacherOrAdmin,
    Admin,
    /// A teacher assigned to the course the operation targets.
    CourseTeacher,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Operation {
    MarkAttendance,
    BuildReport,
    RosterSummary,
    FindByStudent,
    FindByCourse,
    CreateCourse,
    AssignTeacher,
    EnrollStudent,
    UnenrollStudent,
    DeleteCourse,
    CreateUser,
    Profile,
}

impl Operation {
    pub fn required_capability(self) -> Capability {
        match self {
            Operation::MarkAttendance => Capability::CourseTeacher,
            Operation::BuildReport
            | Operation::RosterSummary
            | Operation::CreateCourse
            | Operation::EnrollStudent => Capability::TeacherOrAdmin,
            Operation::AssignTeacher
            | Operation::UnenrollStudent
            | Operation::DeleteCourse
            | Operation::CreateUser => Capability::Admin,
            Operation::FindByStudent | Operation::FindByCourse | Operation::Profile => {
                Capability::Authenticated
            }
        }
    }
}

/// Role part of `capability`, decidable before the target is loaded.
pub fn check_role(capability: Capability, role: Role) -> Result<(), &'static str> {
    match capability {
        Capability::Authenticated => Ok(()),
        Capability::TeacherOrAdmin => match role {
            Role::Admin | Role::Teacher => Ok(()),
            Role::Student => Err("Teacher/Admin only"),
        },
        Capability::Admin => match role {
            Role::Admin => Ok(()),
            _ => Err("Admin only"),
        },
        Capability::CourseTeacher => match role {
            Role::Teacher => Ok(()),
            _ => Err("Teacher only"),
        },
    }
}

/// Checks `capability` for a caller with `role` / `teacher_id`.
/// Returns the reason on refusal.
pub fn check(
    capability: Capability,
    role: Role,
    teacher_id: Option<u64>,
    course: Option<&Course>,
) -> Result<(), &'static str> {
    check_role(capability, role)?;

    if capability != Capability::CourseTeacher {
        return Ok(());
    }

    let course = course.ok_or("Course required")?;
    match (teacher_id, course.teacher_id) {
        (Some(caller), Some(assigned)) if caller == assigned => Ok(()),
        (_, None) => Err("Course has no assigned teacher"),
        _ => Err("Not the teacher of this course"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn course(teacher_id: Option<u64>) -> Course {
        Course {
            id: 1,
            title: "Networks".into(),
            code: "CS-220".into(),
            teacher_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn marking_needs_the_assigned_teacher() {
        let cap = Operation::MarkAttendance.required_capability();
        let c = course(Some(5));

        assert!(check(cap, Role::Teacher, Some(5), Some(&c)).is_ok());
        assert!(check(cap, Role::Teacher, Some(6), Some(&c)).is_err());
        assert!(check(cap, Role::Admin, None, Some(&c)).is_err());
        assert!(check(cap, Role::Student, None, Some(&c)).is_err());
        assert!(check(cap, Role::Teacher, Some(5), Some(&course(None))).is_err());
        assert!(check(cap, Role::Teacher, Some(5), None).is_err());
    }

    #[test]
    fn marking_role_is_decided_without_the_course() {
        let cap = Operation::MarkAttendance.required_capability();
        assert!(check_role(cap, Role::Teacher).is_ok());
        assert_eq!(check_role(cap, Role::Admin), Err("Teacher only"));
        assert_eq!(check_role(cap, Role::Student), Err("Teacher only"));
    }

    #[test]
    fn reports_are_for_teachers_and_admins() {
        let cap = Operation::BuildReport.required_capability();
        assert!(check(cap, Role::Admin, None, None).is_ok());
        assert!(check(cap, Role::Teacher, Some(1), None).is_ok());
        assert_eq!(check(cap, Role::Student, None, None), Err("Teacher/Admin only"));
    }

    #[test]
    fn lookups_need_only_an_identity() {
        for role in [Role::Admin, Role::Teacher, Role::Student] {
            assert!(check(Operation::FindByStudent.required_capability(), role, None, None).is_ok());
        }
    }

    #[test]
    fn course_deletion_and_user_creation_are_admin_only() {
        for op in [Operation::DeleteCourse, Operation::CreateUser] {
            let cap = op.required_capability();
            assert!(check(cap, Role::Admin, None, None).is_ok());
            assert!(check(cap, Role::Teacher, Some(1), None).is_err());
        }
    }
}
