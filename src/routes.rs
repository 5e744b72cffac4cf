use crate::{
    api::{attendance, course, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // burst_size and period are both non-zero above
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = build_limiter(config.rate_login_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(login_limiter)
                .route(web::post().to(handlers::login)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .configure(api),
    );
}

/// Routes served under the API prefix, behind authentication.
pub fn api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            // /attendance/mark
            .service(web::resource("/mark").route(web::post().to(attendance::mark_attendance)))
            // /attendance/report
            .service(web::resource("/report").route(web::post().to(attendance::attendance_report)))
            // /attendance/student/{id}
            .service(
                web::resource("/student/{id}")
                    .route(web::get().to(attendance::student_attendance)),
            )
            // /attendance/course/{id}
            .service(
                web::resource("/course/{id}").route(web::get().to(attendance::course_attendance)),
            ),
    )
    .service(
        web::scope("/courses")
            // /courses
            .service(web::resource("").route(web::post().to(course::create_course)))
            // /courses/{id}
            .service(web::resource("/{id}").route(web::delete().to(course::delete_course)))
            // /courses/{id}/students
            .service(
                web::resource("/{id}/students").route(web::get().to(course::roster_summary)),
            )
            // /courses/{id}/students/{student_id}
            .service(
                web::resource("/{id}/students/{student_id}")
                    .route(web::post().to(course::enroll_student))
                    .route(web::delete().to(course::unenroll_student)),
            )
            // /courses/{id}/teacher/{teacher_id}
            .service(
                web::resource("/{id}/teacher/{teacher_id}")
                    .route(web::post().to(course::assign_teacher)),
            ),
    )
    .service(
        web::scope("/users")
            // /users
            .service(web::resource("").route(web::post().to(user::create_user))),
    )
    .service(
        web::scope("/user")
            // /user/profile
            .service(web::resource("/profile").route(web::get().to(handlers::profile))),
    );
}
