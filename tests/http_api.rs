mod common;

use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::web::{self, Data};
use actix_web::{App, test};
use attendance::auth::handlers;
use attendance::auth::jwt::{TokenSubject, generate_access_token};
use attendance::auth::middleware::auth_middleware;
use attendance::config::Config;
use attendance::model::role::Role;
use attendance::routes;
use attendance::store::{AttendanceStore, CourseDirectory, MemoryStore, UserStore};
use common::{TEACHER_ID, seeded};
use serde_json::{Value, json};
use std::sync::Arc;

const SECRET: &str = "test-secret";

fn config() -> Config {
    Config {
        database_url: String::new(),
        db_max_connections: 1,
        jwt_secret: SECRET.into(),
        server_addr: "127.0.0.1:0".into(),
        access_token_ttl: 900,
        rate_login_per_min: 60,
        rate_protected_per_min: 1000,
        api_prefix: "/api".into(),
        log_dir: "logs".into(),
    }
}

fn token(role: Role, teacher_id: Option<u64>, student_id: Option<u64>) -> String {
    let subject = TokenSubject {
        user_id: 1,
        email: format!("{role}@school.edu"),
        role,
        teacher_id,
        student_id,
    };
    format!("Bearer {}", generate_access_token(&subject, SECRET, 900).unwrap())
}

fn teacher() -> String {
    token(Role::Teacher, Some(TEACHER_ID), None)
}

fn admin() -> String {
    token(Role::Admin, None, None)
}

fn student() -> String {
    token(Role::Student, None, Some(1))
}

macro_rules! app {
    ($store:expr) => {{
        let attendance: Arc<dyn AttendanceStore> = $store.clone();
        let directory: Arc<dyn CourseDirectory> = $store.clone();
        let users: Arc<dyn UserStore> = $store.clone();
        test::init_service(
            App::new()
                .app_data(Data::new(config()))
                .app_data(Data::from(attendance))
                .app_data(Data::from(directory))
                .app_data(Data::from(users))
                .route("/auth/login", web::post().to(handlers::login))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .configure(routes::api),
                ),
        )
        .await
    }};
}

fn mark_body(course_id: u64, date: &str, records: Value) -> Value {
    json!({ "courseId": course_id, "date": date, "records": records })
}

async fn seeded_arc() -> (Arc<MemoryStore>, u64) {
    let (store, course) = seeded().await;
    (Arc::new(store), course.id)
}

#[actix_web::test]
async fn requests_without_token_are_unauthorized() {
    let (store, course_id) = seeded_arc().await;
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri(&format!("/api/attendance/course/{course_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/attendance/course/{course_id}"))
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn course_teacher_marks_and_remarks() {
    let (store, course_id) = seeded_arc().await;
    let app = app!(store);
    let body = mark_body(
        course_id,
        "2024-01-01T09:00:00Z",
        json!([{ "studentId": 1, "status": "present" }, { "studentId": 2, "status": "absent" }]),
    );

    let req = test::TestRequest::post()
        .uri("/api/attendance/mark")
        .insert_header(("Authorization", teacher()))
        .set_json(&body)
        .to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(first["msg"], "Attendance marked successfully");
    assert_eq!(first["result"]["inserted"], 2);
    assert_eq!(first["result"]["date"], "2024-01-01");

    let req = test::TestRequest::post()
        .uri("/api/attendance/mark")
        .insert_header(("Authorization", teacher()))
        .set_json(&body)
        .to_request();
    let second: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(second["result"]["inserted"], 0);
    assert_eq!(second["result"]["updated"], 2);

    assert_eq!(store.records().unwrap().len(), 2);
}

#[actix_web::test]
async fn only_the_assigned_teacher_may_mark() {
    let (store, course_id) = seeded_arc().await;
    let app = app!(store);
    let body = mark_body(course_id, "2024-01-01", json!([{ "studentId": 1, "status": "present" }]));

    for auth in [token(Role::Teacher, Some(TEACHER_ID + 1), None), admin(), student()] {
        let req = test::TestRequest::post()
            .uri("/api/attendance/mark")
            .insert_header(("Authorization", auth))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    assert!(store.records().unwrap().is_empty());
}

#[actix_web::test]
async fn invalid_batches_are_rejected_without_writes() {
    let (store, course_id) = seeded_arc().await;
    let app = app!(store);

    let bad = [
        mark_body(course_id, "2024-01-01", json!([])),
        mark_body(course_id, "2024-01-01", json!([{ "studentId": 1, "status": "present" }, { "studentId": 2, "status": "late" }])),
        mark_body(course_id, "first of january", json!([{ "studentId": 1, "status": "present" }])),
    ];

    for body in bad {
        let req = test::TestRequest::post()
            .uri("/api/attendance/mark")
            .insert_header(("Authorization", teacher()))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    assert!(store.records().unwrap().is_empty());
}

#[actix_web::test]
async fn marking_an_unknown_course_is_not_found() {
    let (store, _) = seeded_arc().await;
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/attendance/mark")
        .insert_header(("Authorization", teacher()))
        .set_json(mark_body(404, "2024-01-01", json!([{ "studentId": 1, "status": "present" }])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn non_teachers_are_refused_before_the_course_lookup() {
    let (store, _) = seeded_arc().await;
    let app = app!(store);
    let body = mark_body(999, "2024-01-01", json!([{ "studentId": 1, "status": "present" }]));

    for auth in [student(), admin()] {
        let req = test::TestRequest::post()
            .uri("/api/attendance/mark")
            .insert_header(("Authorization", auth))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

macro_rules! mark_three_lectures {
    ($app:expr, $course_id:expr) => {
        for (date, status) in [("2024-01-01", "present"), ("2024-01-02", "absent"), ("2024-01-03", "present")] {
            let req = test::TestRequest::post()
                .uri("/api/attendance/mark")
                .insert_header(("Authorization", teacher()))
                .set_json(mark_body($course_id, date, json!([{ "studentId": 1, "status": status }])))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
    };
}

#[actix_web::test]
async fn report_honours_threshold_and_roles() {
    let (store, course_id) = seeded_arc().await;
    let app = app!(store);
    mark_three_lectures!(app, course_id);

    let req = test::TestRequest::post()
        .uri("/api/attendance/report")
        .insert_header(("Authorization", admin()))
        .set_json(json!({ "courseId": course_id }))
        .to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["totalLectures"], 3);
    assert_eq!(report["report"][0]["studentId"], 1);
    assert_eq!(report["report"][0]["presentCount"], 2);
    assert_eq!(report["report"][0]["total"], 3);
    assert_eq!(report["report"][0]["percentage"], 66.67);

    let req = test::TestRequest::post()
        .uri("/api/attendance/report")
        .insert_header(("Authorization", teacher()))
        .set_json(json!({ "courseId": course_id, "minPercentage": 70 }))
        .to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["totalLectures"], 3);
    assert_eq!(report["report"], json!([]));

    let req = test::TestRequest::post()
        .uri("/api/attendance/report")
        .insert_header(("Authorization", student()))
        .set_json(json!({ "courseId": course_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/attendance/report")
        .insert_header(("Authorization", admin()))
        .set_json(json!({ "courseId": course_id, "fromDate": "2024-02-01", "toDate": "2024-01-01" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn lookups_return_enriched_records() {
    let (store, course_id) = seeded_arc().await;
    let app = app!(store);
    mark_three_lectures!(app, course_id);

    let req = test::TestRequest::get()
        .uri("/api/attendance/student/1")
        .insert_header(("Authorization", student()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["courseTitle"], "Networks");
    assert_eq!(records[0]["courseCode"], "CS-220");
    assert_eq!(records[1]["status"], "absent");

    let req = test::TestRequest::get()
        .uri(&format!("/api/attendance/course/{course_id}"))
        .insert_header(("Authorization", teacher()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 3);
    assert_eq!(body["records"][0]["enrollmentNumber"], "ENR-001");
}

#[actix_web::test]
async fn roster_summary_uses_display_percentages() {
    let (store, course_id) = seeded_arc().await;
    let app = app!(store);
    mark_three_lectures!(app, course_id);

    let req = test::TestRequest::get()
        .uri(&format!("/api/courses/{course_id}/students"))
        .insert_header(("Authorization", teacher()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["course"]["code"], "CS-220");
    let students = body["students"].as_array().unwrap();
    assert_eq!(students.len(), 3);
    assert_eq!(students[0]["percentage"], "66.67");
    assert_eq!(students[2]["percentage"], "0.00");
    assert_eq!(students[2]["totalLectures"], 3);
}

#[actix_web::test]
async fn deleting_a_course_cascades_to_attendance() {
    let (store, course_id) = seeded_arc().await;
    let app = app!(store);
    mark_three_lectures!(app, course_id);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/courses/{course_id}"))
        .insert_header(("Authorization", teacher()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.records().unwrap().len(), 3);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/courses/{course_id}"))
        .insert_header(("Authorization", admin()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(store.records().unwrap().is_empty());

    let req = test::TestRequest::post()
        .uri("/api/attendance/report")
        .insert_header(("Authorization", admin()))
        .set_json(json!({ "courseId": course_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn course_creation_and_enrollment() {
    let store = Arc::new(MemoryStore::new());
    store.add_student(common::student(5)).unwrap();
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/courses")
        .insert_header(("Authorization", teacher()))
        .set_json(json!({ "title": "Databases", "code": "CS-330" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let course_id = created["course"]["id"].as_u64().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/courses")
        .insert_header(("Authorization", admin()))
        .set_json(json!({ "title": "Databases again", "code": "CS-330" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/courses/{course_id}/students/5"))
        .insert_header(("Authorization", teacher()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["enrolled"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/api/courses/{course_id}/students/6"))
        .insert_header(("Authorization", teacher()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&format!("/api/courses/{course_id}/teacher/{TEACHER_ID}"))
        .insert_header(("Authorization", admin()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    // Teacher 10 is not registered in this store.
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

fn new_teacher() -> Value {
    json!({
        "name": "Grace Hopper",
        "email": "grace@school.edu",
        "password": "c0bol",
        "role": "teacher",
        "department": "Computer Science"
    })
}

#[actix_web::test]
async fn provisioned_user_can_log_in_and_read_profile() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(("Authorization", admin()))
        .set_json(new_teacher())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["user"]["email"], "grace@school.edu");
    assert!(created["user"]["teacherId"].is_u64());
    assert!(created["user"].get("password").is_none());

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "grace@school.edu", "password": "c0bol" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login: Value = test::read_body_json(resp).await;
    assert_eq!(login["role"], "teacher");
    let access_token = login["access_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/user/profile")
        .insert_header(("Authorization", format!("Bearer {access_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = test::read_body_json(resp).await;
    assert_eq!(profile["name"], "Grace Hopper");
    assert_eq!(profile["roleId"], 2);
    assert_eq!(profile["teacherId"], created["user"]["teacherId"]);
}

#[actix_web::test]
async fn login_rejects_bad_credentials() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(("Authorization", admin()))
        .set_json(new_teacher())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    for (email, password) in [("grace@school.edu", "fortran"), ("nobody@school.edu", "c0bol")] {
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "", "password": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn profile_of_an_unknown_account_is_not_found() {
    let (store, _) = seeded_arc().await;
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri("/api/user/profile")
        .insert_header(("Authorization", teacher()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn user_creation_is_admin_only_and_validated() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(("Authorization", teacher()))
        .set_json(new_teacher())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(("Authorization", admin()))
        .set_json(json!({ "name": "Ada", "email": "ada@school.edu", "password": "x", "role": "student" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let req = test::TestRequest::post()
            .uri("/api/users")
            .insert_header(("Authorization", admin()))
            .set_json(new_teacher())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), expected);
    }
}
