use actix_web::{App, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;

use collectmob::database::repositories::ResultRepository;
use collectmob::handlers::results;

mod common;

fn routes() -> actix_web::Scope {
    web::scope("/api/v1/results")
        .route("", web::post().to(results::create_result))
        .route("", web::get().to(results::get_results))
}

#[actix_web::test]
#[serial]
async fn anonymous_results_are_accepted() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let team = common::create_team(&ctx.pool, "Nord", "").await;

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ResultRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/results")
        .set_json(json!({ "amount": 120, "teamId": team.id, "comment": "Good day" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["amount"], 120);
    assert_eq!(body["data"]["userId"], serde_json::Value::Null);
    assert_eq!(body["data"]["teamId"], team.id);
}

#[actix_web::test]
#[serial]
async fn authenticated_reporter_is_recorded() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let user = common::create_user(&ctx.pool, "Ada", "ada@example.com").await;

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ResultRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/results")
        .insert_header(common::auth_header(&ctx.token_for(&user)))
        .set_json(json!({ "amount": 40 }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["userId"], user.id);
}

#[actix_web::test]
#[serial]
async fn negative_amounts_are_rejected() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ResultRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/results")
        .set_json(json!({ "amount": -5 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn listing_results_is_staff_only() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let user = common::create_user(&ctx.pool, "Ada", "ada@example.com").await;
    let staff = common::create_staff(&ctx.pool, "Staff", "staff@example.com", "secret123").await;

    ResultRepository::new(ctx.pool.clone())
        .create(
            serde_json::from_value(json!({ "amount": 7 })).unwrap(),
            None,
        )
        .await
        .unwrap();

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ResultRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/results")
        .insert_header(common::auth_header(&ctx.token_for(&user)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/v1/results")
        .insert_header(common::auth_header(&ctx.token_for(&staff)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
