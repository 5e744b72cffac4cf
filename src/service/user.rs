use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::auth::password::{hash_password, verify_password};
use crate::error::AttendanceError;
use crate::model::role::Role;
use crate::model::user::{NewUser, NewUserKind, User, UserProfile};
use crate::store::UserStore;

/// Account to provision. Teachers need a department, students an
/// enrollment number.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@school.edu")]
    pub email: String,
    #[schema(example = "s3cret")]
    pub password: String,
    #[schema(example = "teacher")]
    pub role: String,
    #[schema(example = "ENR-042", nullable = true)]
    pub enrollment_number: Option<String>,
    #[schema(example = "Computer Science", nullable = true)]
    pub department: Option<String>,
}

fn required(value: Option<&str>, field: &str) -> Result<String, AttendanceError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AttendanceError::Validation(format!("{field} is required"))),
    }
}

#[instrument(skip(users, req), fields(email = %req.email, role = %req.role), err)]
pub async fn create_user(
    users: &dyn UserStore,
    req: &CreateUserRequest,
) -> Result<UserProfile, AttendanceError> {
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AttendanceError::Validation(
            "name, email and password are required".into(),
        ));
    }

    let role: Role = req
        .role
        .trim()
        .parse()
        .map_err(|_| AttendanceError::Validation(format!("Invalid role: {}", req.role)))?;

    let kind = match role {
        Role::Admin => NewUserKind::Admin,
        Role::Teacher => NewUserKind::Teacher {
            department: required(req.department.as_deref(), "department")?,
        },
        Role::Student => NewUserKind::Student {
            enrollment_number: required(req.enrollment_number.as_deref(), "enrollmentNumber")?,
        },
    };

    let password_hash = hash_password(&req.password)
        .map_err(|e| AttendanceError::Internal(format!("password hashing failed: {e}")))?;

    let user = users
        .create_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            kind,
        })
        .await?;

    info!(user_id = user.id, "User created");
    Ok(user)
}

/// Resolves credentials to an account. Unknown email and wrong password
/// are indistinguishable to the caller.
pub async fn authenticate(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AttendanceError> {
    let invalid = || AttendanceError::Unauthorized("Invalid credentials".into());

    let user = users.find_by_email(email.trim()).await?.ok_or_else(invalid)?;
    verify_password(password, &user.password).map_err(|_| invalid())?;
    Ok(user)
}
