use actix_web::{App, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;

use collectmob::database::repositories::{EventRepository, TeamRepository, UserRepository};
use collectmob::handlers::teams;

mod common;

fn routes() -> actix_web::Scope {
    web::scope("/api/v1/teams")
        .route("", web::get().to(teams::get_teams))
        .route("/{id}", web::get().to(teams::get_team))
        .route("/{id}/join", web::post().to(teams::join_team))
        .route("/{id}/signup", web::post().to(teams::signup_and_join))
}

#[actix_web::test]
#[serial]
async fn repeated_join_keeps_a_single_membership() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();

    let team = common::create_team(&ctx.pool, "Nord", "#nord").await;
    let user = common::create_user(&ctx.pool, "Ada", "ada@example.com").await;
    let token = ctx.token_for(&user);

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(TeamRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/teams/{}/join", team.id))
            .insert_header(common::auth_header(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(common::count_rows(&ctx.pool, "team_members").await, 1);

    // Only the first join announces the new member.
    ctx.settle().await;
    assert_eq!(ctx.chat.sent().len(), 1);
    assert!(ctx.chat.sent()[0].text.contains("Ada"));
    assert_eq!(ctx.chat.sent()[0].channel, "#nord");
}

#[actix_web::test]
#[serial]
async fn signup_creates_account_and_mails_autologin_link() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();

    let team = common::create_team(&ctx.pool, "Mitte", "").await;

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(TeamRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(UserRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/teams/{}/signup", team.id))
        .set_json(json!({ "name": "Berta", "email": "berta@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["member"]["teamId"], team.id);

    assert_eq!(common::count_rows(&ctx.pool, "users").await, 1);
    assert_eq!(common::count_rows(&ctx.pool, "team_members").await, 1);

    ctx.settle().await;
    let mails = ctx.mail.sent();
    let welcome = mails
        .iter()
        .find(|m| m.to == "berta@example.com")
        .expect("welcome mail missing");
    assert!(welcome.body.contains("/go/"));
    assert!(welcome.subject.contains("Mitte"));
}

#[actix_web::test]
#[serial]
async fn signup_rejects_an_existing_email() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();

    let team = common::create_team(&ctx.pool, "Mitte", "").await;
    common::create_user(&ctx.pool, "Berta", "berta@example.com").await;

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(TeamRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(UserRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/teams/{}/signup", team.id))
        .set_json(json!({ "name": "Berta again", "email": "berta@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::count_rows(&ctx.pool, "users").await, 1);
}

#[actix_web::test]
#[serial]
async fn team_detail_reports_membership_for_the_caller() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();

    let team = common::create_team(&ctx.pool, "Sued", "").await;
    let member = common::create_user(&ctx.pool, "Carol", "carol@example.com").await;
    let outsider = common::create_user(&ctx.pool, "Dan", "dan@example.com").await;

    let teams_repo = TeamRepository::new(ctx.pool.clone());
    let mut tx = ctx.pool.begin().await.unwrap();
    teams_repo.add_member(&mut tx, team.id, member.id).await.unwrap();
    tx.commit().await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(teams_repo))
            .app_data(web::Data::new(EventRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    // Anonymous callers get no membership flag at all.
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/teams/{}", team.id))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["isMember"], serde_json::Value::Null);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/teams/{}", team.id))
        .insert_header(common::auth_header(&ctx.token_for(&member)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["isMember"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/teams/{}", team.id))
        .insert_header(common::auth_header(&ctx.token_for(&outsider)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["isMember"], false);
}

#[actix_web::test]
#[serial]
async fn joining_an_unknown_team_is_not_found() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let user = common::create_user(&ctx.pool, "Ada", "ada@example.com").await;

    let app = test::init_service(
        App::new()
            .app_data(ctx.app_state())
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(TeamRepository::new(ctx.pool.clone())))
            .app_data(web::Data::new(ctx.config.clone()))
            .service(routes()),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/teams/4242/join")
        .insert_header(common::auth_header(&ctx.token_for(&user)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    ctx.settle().await;
    assert!(ctx.chat.sent().is_empty());
}
