use crate::{
    auth::{
        auth::AuthUser,
        capability::Operation,
        jwt::{TokenSubject, generate_access_token},
    },
    config::Config,
    error::AttendanceError,
    model::role::Role,
    models::LoginReqDto,
    service::user::authenticate,
    store::UserStore,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    #[schema(example = "teacher")]
    pub role: String,
}

// #[post("/login")]
#[instrument(
    name = "auth_login",
    skip(users, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    users: web::Data<dyn UserStore>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    // 1️⃣ Basic validation
    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().body("Email or password required");
    }

    debug!("Checking credentials");

    // 2️⃣ Resolve and verify credentials
    let db_user = match authenticate(users.get_ref(), &user.email, &user.password).await {
        Ok(found) => {
            debug!(user_id = found.id, "Credentials accepted");
            found
        }
        Err(AttendanceError::Unauthorized(_)) => {
            info!("Invalid credentials");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Store error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let Some(role) = Role::from_id(db_user.role_id) else {
        error!(user_id = db_user.id, role_id = db_user.role_id, "Unknown role on user");
        return HttpResponse::InternalServerError().finish();
    };

    // 3️⃣ Generate access token
    let subject = TokenSubject {
        user_id: db_user.id,
        email: db_user.email.clone(),
        role,
        teacher_id: db_user.teacher_id,
        student_id: db_user.student_id,
    };

    let access_token =
        match generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "Failed to sign access token");
                return HttpResponse::InternalServerError().finish();
            }
        };

    // 4️⃣ Update last_login_at (non-fatal)
    if let Err(e) = users.record_login(db_user.id).await {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        role: role.to_string(),
    })
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "Profile of the caller", body = UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn profile(
    auth: AuthUser,
    users: web::Data<dyn UserStore>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::Profile, None)?;

    match users.profile(auth.user_id).await.map_err(AttendanceError::from)? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(AttendanceError::NotFound("User not found".into()).into()),
    }
}
