use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, web};
use anyhow::Result;

use collectmob::database::{
    init_database,
    repositories::{
        EventRepository, LocationRepository, ResultRepository, ScheduleRepository, TeamRepository,
        UserRepository,
    },
};
use collectmob::handlers::{admin, auth, events, feed, locations, results, teams};
use collectmob::services::{
    Dispatcher, FeedService, HttpMailer, Notifier, NotifierSettings, Scheduler, SlackWebhook,
    sweep::run_reminder_loop,
};
use collectmob::{AppState, AuthService, Config};

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("CollectMob API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    println!("🚀 Starting CollectMob API server...");

    // Load configuration
    let config = Config::from_env()?;
    println!(
        "📋 Configuration loaded (environment: {})",
        config.environment
    );

    // Initialize database
    let pool = init_database(&config.database_url).await?;
    println!("✅ Database initialized");

    // Initialize repositories
    let user_repository = UserRepository::new(pool.clone());
    let team_repository = TeamRepository::new(pool.clone());
    let location_repository = LocationRepository::new(pool.clone());
    let schedule_repository = ScheduleRepository::new(pool.clone());
    let event_repository = EventRepository::new(pool.clone());
    let result_repository = ResultRepository::new(pool.clone());

    // Outbound sinks and the notification pipeline
    let chat = Arc::new(SlackWebhook::new(config.chat_webhook_url.clone()));
    let mail = Arc::new(HttpMailer::new(config.mail_api_url.clone()));
    let notifier = Arc::new(Notifier::new(
        user_repository.clone(),
        team_repository.clone(),
        location_repository.clone(),
        event_repository.clone(),
        chat,
        mail.clone(),
        NotifierSettings {
            site_url: config.site_url.clone(),
            default_channel: config.chat_default_channel.clone(),
            bot_name: config.chat_bot_name.clone(),
            mail_from: config.mail_from.clone(),
            bulk_queue: config.mail_bulk_queue.clone(),
            local_offset: config.local_offset(),
        },
    ));
    let dispatcher = Dispatcher::new(notifier.clone());

    let scheduler = Scheduler::new(
        pool.clone(),
        schedule_repository.clone(),
        event_repository.clone(),
        team_repository.clone(),
        config.local_offset(),
    );
    let feed_service = FeedService::new(
        team_repository.clone(),
        event_repository.clone(),
        location_repository.clone(),
        config.site_url.clone(),
        config.feed_lookahead_days,
        config.local_offset(),
    );
    let auth_service = AuthService::new(user_repository.clone(), config.clone());

    let app_state = web::Data::new(AppState {
        auth_service,
        dispatcher,
        mail,
        mail_from: config.mail_from.clone(),
        mail_bulk_queue: config.mail_bulk_queue.clone(),
    });
    let pool_data = web::Data::new(pool.clone());
    let user_repo_data = web::Data::new(user_repository);
    let team_repo_data = web::Data::new(team_repository);
    let location_repo_data = web::Data::new(location_repository);
    let event_repo_data = web::Data::new(event_repository);
    let result_repo_data = web::Data::new(result_repository);
    let scheduler_data = web::Data::new(scheduler);
    let feed_data = web::Data::new(feed_service);
    let config_data = web::Data::new(config.clone());

    // Hourly sweep for upcoming-event reminders
    tokio::spawn(run_reminder_loop(
        notifier.clone(),
        config.reminder_interval_secs,
    ));

    let server_address = config.server_address();
    println!("🌐 Server starting on http://{}", server_address);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(pool_data.clone())
            .app_data(user_repo_data.clone())
            .app_data(team_repo_data.clone())
            .app_data(location_repo_data.clone())
            .app_data(event_repo_data.clone())
            .app_data(result_repo_data.clone())
            .app_data(scheduler_data.clone())
            .app_data(feed_data.clone())
            .app_data(config_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin("http://localhost:3000")
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(hello)
            .service(health)
            .route(
                "/go/{user_id}/{secret}/{path:.*}",
                web::get().to(auth::link_login),
            )
            .service(
                web::scope("/api/v1")
                    .route("/map", web::get().to(feed::map_feed))
                    .service(
                        web::scope("/auth")
                            .route("/login", web::post().to(auth::login))
                            .route("/me", web::get().to(auth::me)),
                    )
                    .service(
                        web::scope("/teams")
                            .route("", web::get().to(teams::get_teams))
                            .route("/{id}", web::get().to(teams::get_team))
                            .route("/{id}/join", web::post().to(teams::join_team))
                            .route("/{id}/signup", web::post().to(teams::signup_and_join)),
                    )
                    .service(
                        web::scope("/locations")
                            .route("", web::post().to(locations::create_location))
                            .route("/{id}", web::get().to(locations::get_location))
                            .route("/{id}/report", web::post().to(locations::report_location))
                            .route("/{id}/material", web::post().to(locations::request_material))
                            .route(
                                "/{id}/material/sent",
                                web::post().to(locations::confirm_material_sent),
                            ),
                    )
                    .service(
                        web::scope("/events")
                            .route("/materialize", web::post().to(events::materialize_event))
                            .route("/{id}", web::get().to(events::get_event))
                            .route("/{id}/join", web::post().to(events::join_event))
                            .route(
                                "/{event_id}/members/{member_id}",
                                web::delete().to(events::leave_event),
                            ),
                    )
                    .service(
                        web::scope("/results")
                            .route("", web::post().to(results::create_result))
                            .route("", web::get().to(results::get_results)),
                    )
                    .service(
                        web::scope("/admin")
                            .route("/bulk-mail", web::post().to(admin::send_bulk_mail)),
                    ),
            )
    })
    .bind(server_address)?
    .run()
    .await?;

    Ok(())
}
