use actix_cors::Cors;
use actix_web::{self, App, HttpServer, http::header, middleware::Logger, web};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{RedisCache, connect_database, init_tracing},
    modules::{
        anonymous::{repository_pg::AnonymousChatRepositoryPg, service::AnonymousChatService},
        expiry::reaper::{ExpiryReaper, ExpirySweep},
        friend::{repository_pg::FriendRepositoryPg, service::FriendService},
        message::{repository_pg::MessageRepositoryPg, service::MessageService},
        quiz::{repository_pg::QuizRepositoryPg, service::QuizService},
        story::{repository_pg::StoryRepositoryPg, service::StoryService},
        streak::{repository_pg::StreakRepositoryPg, service::StreakService},
        user::{repository_pg::UserRepositoryPg, service::UserService},
        websocket::{
            handler::websocket_handler, presence::PresenceService, registry::PresenceRegistry,
            state::AppState,
        },
    },
    utils::{Clock, SystemClock},
};

mod api;
mod configs;
mod constants;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check(registry: web::Data<PresenceRegistry>) -> String {
    format!("Server is running ({} online)", registry.online_count())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    LazyLock::force(&ENV);
    init_tracing();

    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    let redis_pool =
        RedisCache::new().await.map_err(|_| std::io::Error::other("Redis connection error"))?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = PresenceRegistry::new();

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let friend_repo = Arc::new(FriendRepositoryPg::new(db_pool.clone()));
    let message_repo = Arc::new(MessageRepositoryPg::new(db_pool.clone()));
    let story_repo = Arc::new(StoryRepositoryPg::new(db_pool.clone()));
    let streak_repo = Arc::new(StreakRepositoryPg::new(db_pool.clone()));
    let chat_repo = Arc::new(AnonymousChatRepositoryPg::new(db_pool.clone()));
    let quiz_repo = Arc::new(QuizRepositoryPg::new(db_pool.clone()));

    let user_service = UserService::with_dependencies(user_repo.clone(), Arc::new(redis_pool));
    let streak_service = StreakService::with_dependencies(
        streak_repo,
        friend_repo.clone(),
        clock.clone(),
        ENV.day_offset,
    );

    let state = AppState {
        presence: PresenceService::with_dependencies(
            registry.clone(),
            user_repo.clone(),
            clock.clone(),
        ),
        friends: FriendService::with_dependencies(
            friend_repo.clone(),
            user_repo.clone(),
            registry.clone(),
            clock.clone(),
        ),
        messages: MessageService::with_dependencies(
            message_repo.clone(),
            friend_repo.clone(),
            user_repo.clone(),
            streak_service.clone(),
            registry.clone(),
            clock.clone(),
        ),
        stories: StoryService::with_dependencies(story_repo.clone(), friend_repo.clone(), clock.clone()),
        streaks: streak_service,
        anonymous: AnonymousChatService::with_dependencies(
            chat_repo.clone(),
            registry.clone(),
            clock.clone(),
        ),
        quizzes: QuizService::with_dependencies(
            quiz_repo.clone(),
            friend_repo,
            user_repo,
            registry.clone(),
            clock.clone(),
        ),
    };

    let sweeps: Vec<Arc<dyn ExpirySweep>> = vec![
        message_repo as Arc<dyn ExpirySweep>,
        story_repo as Arc<dyn ExpirySweep>,
        chat_repo as Arc<dyn ExpirySweep>,
        quiz_repo as Arc<dyn ExpirySweep>,
    ];
    let reaper = ExpiryReaper::new(
        sweeps,
        clock,
        std::time::Duration::from_secs(ENV.cleanup_interval_secs),
    );
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let reaper_task = tokio::spawn(reaper.run(shutdown_rx));

    let state = web::Data::new(state);
    let user_service = web::Data::new(user_service);
    let registry = web::Data::new(registry);

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ENV.frontend_url)
            .allowed_methods(vec!["GET"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(user_service.clone())
            .app_data(registry.clone())
            .service(health_check)
            .route("/ws", web::get().to(websocket_handler))
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(ENV.workers)
    .run()
    .await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = reaper_task.await {
        log::error!("Expiry reaper task failed: {}", e);
    }

    result
}
