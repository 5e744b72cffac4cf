use crate::auth::capability::{self, Operation};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AttendanceError;
use crate::model::course::Course;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,

    /// Present only if this user is linked to a teacher record
    pub teacher_id: Option<u64>,
    /// Present only if this user is linked to a student record
    pub student_id: Option<u64>,
}

impl AuthUser {
    /// Resolves a bearer token into an identity.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, AttendanceError> {
        let claims = verify_token(token, secret)
            .map_err(|_| AttendanceError::Unauthorized("Invalid or expired token".into()))?;

        let role = Role::from_id(claims.role)
            .ok_or_else(|| AttendanceError::Unauthorized("Invalid role".into()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role,
            teacher_id: claims.teacher_id,
            student_id: claims.student_id,
        })
    }

    /// Role-only part of the check for `op`; runs before the target course
    /// is loaded.
    pub fn authorize_role(&self, op: Operation) -> Result<(), AttendanceError> {
        capability::check_role(op.required_capability(), self.role)
            .map_err(|reason| self.refuse(op, reason))
    }

    /// Capability check for `op`. `course` is needed for course-bound
    /// operations such as marking.
    pub fn authorize(&self, op: Operation, course: Option<&Course>) -> Result<(), AttendanceError> {
        capability::check(op.required_capability(), self.role, self.teacher_id, course)
            .map_err(|reason| self.refuse(op, reason))
    }

    fn refuse(&self, op: Operation, reason: &'static str) -> AttendanceError {
        tracing::info!(user_id = self.user_id, ?op, reason, "Capability check refused");
        AttendanceError::Forbidden(reason.into())
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = AttendanceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already resolved by auth_middleware.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req) {
            Some(t) => t,
            None => return ready(Err(AttendanceError::Unauthorized("Missing token".into()))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(AttendanceError::Storage(
                    crate::error::StoreError::Unavailable("Config missing".into()),
                )));
            }
        };

        ready(AuthUser::from_token(token, &config.jwt_secret))
    }
}
