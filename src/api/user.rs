use crate::auth::{auth::AuthUser, capability::Operation};
use crate::model::user::UserProfile;
use crate::service::user::{self, CreateUserRequest};
use crate::store::UserStore;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "User created successfully")]
    pub msg: String,
    pub user: UserProfile,
}

/// Create an account with its teacher or student record (admin only)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Missing field or unknown role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn create_user(
    auth: AuthUser,
    users: web::Data<dyn UserStore>,
    payload: web::Json<CreateUserRequest>,
) -> actix_web::Result<impl Responder> {
    auth.authorize(Operation::CreateUser, None)?;

    let user = user::create_user(users.get_ref(), &payload).await?;

    Ok(HttpResponse::Created().json(UserResponse {
        msg: "User created successfully".into(),
        user,
    }))
}
