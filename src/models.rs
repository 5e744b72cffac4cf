use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct LoginReqDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    /// Present only if this user is linked to a teacher record
    pub teacher_id: Option<u64>,
    /// Present only if this user is linked to a student record
    pub student_id: Option<u64>,
}
