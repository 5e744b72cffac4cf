use serde::{Deserialize, Serialize};

use crate::model::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: u8,
    pub teacher_id: Option<u64>,
    pub student_id: Option<u64>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role_id: self.role_id,
            teacher_id: self.teacher_id,
            student_id: self.student_id,
        }
    }
}

/// User as returned to clients; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@school.edu")]
    pub email: String,
    #[schema(example = 2)]
    pub role_id: u8,
    pub teacher_id: Option<u64>,
    pub student_id: Option<u64>,
}

/// Role of a new account, with the record it is linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewUserKind {
    Admin,
    Teacher { department: String },
    Student { enrollment_number: String },
}

impl NewUserKind {
    pub fn role(&self) -> Role {
        match self {
            NewUserKind::Admin => Role::Admin,
            NewUserKind::Teacher { .. } => Role::Teacher,
            NewUserKind::Student { .. } => Role::Student,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub kind: NewUserKind,
}
