use actix_web::{App, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;

use collectmob::auth::AUTH_COOKIE;
use collectmob::database::repositories::UserRepository;
use collectmob::handlers::auth;

mod common;

fn app_routes() -> actix_web::Scope {
    web::scope("/api/v1/auth")
        .route("/login", web::post().to(auth::login))
        .route("/me", web::get().to(auth::me))
}

#[actix_web::test]
#[serial]
async fn login_and_me_workflow() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    common::create_login_user(&ctx.pool, "Ada", "ada@example.com", "password123").await;

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(UserRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(app_routes()),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "password123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");
    // The hash never leaves the server.
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(common::auth_header(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["name"], "Ada");
}

#[actix_web::test]
#[serial]
async fn login_rejects_bad_credentials() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    common::create_login_user(&ctx.pool, "Ada", "ada@example.com", "password123").await;

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ctx.config.clone()))
            .service(app_routes()),
    )
    .await;

    for (email, password) in [
        ("ada@example.com", "wrong"),
        ("nobody@example.com", "password123"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

#[actix_web::test]
#[serial]
async fn me_requires_a_token() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(UserRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(app_routes()),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn autologin_link_sets_a_session_cookie() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let user = common::create_user(&ctx.pool, "Ada", "ada@example.com").await;
    let secret = ctx.auth_service.autologin_secret(user.id, user.last_login);

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(UserRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .route(
                "/go/{user_id}/{secret}/{path:.*}",
                web::get().to(auth::link_login),
            ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/go/{}/{}/teams/1", user.id, secret))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get("Location").unwrap().to_str().unwrap(),
        "/teams/1"
    );
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == AUTH_COOKIE)
        .expect("auth cookie missing");
    assert!(!cookie.value().is_empty());

    // Logging in moved last_login, so the link is spent.
    let req = test::TestRequest::get()
        .uri(&format!("/go/{}/{}/teams/1", user.id, secret))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(
        resp.response()
            .cookies()
            .all(|c| c.name() != AUTH_COOKIE)
    );
}

#[actix_web::test]
#[serial]
async fn autologin_with_a_wrong_secret_redirects_without_login() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let user = common::create_user(&ctx.pool, "Ada", "ada@example.com").await;

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(UserRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .route(
                "/go/{user_id}/{secret}/{path:.*}",
                web::get().to(auth::link_login),
            ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/go/{}/{}/teams/1", user.id, "0".repeat(32)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get("Location").unwrap().to_str().unwrap(),
        "/teams/1"
    );
    assert!(
        resp.response()
            .cookies()
            .all(|c| c.name() != AUTH_COOKIE)
    );
}
