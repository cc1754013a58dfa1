use actix_web::{
    middleware,
    web::{self, Data},
    App, HttpResponse, HttpServer,
};
use log::info;
use sqlx::SqlitePool;

mod auth;
mod config;
mod customers;
mod db;
mod demo;
mod errors;
mod leads;
mod reports;
mod routes;
mod structs;
#[cfg(test)]
mod test_utils;
mod utils;

use auth::TokenKeys;
use config::Config;
use errors::AppError;

#[derive(Clone)]
pub struct AppState {
    db_pool: SqlitePool,
    tokens: TokenKeys,
    seed_demo_data: bool,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, tokens: TokenKeys, seed_demo_data: bool) -> Self {
        AppState {
            db_pool,
            tokens,
            seed_demo_data,
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().unwrap_or_else(|e| {
        log::error!("FATAL: {}", e);
        std::process::exit(1);
    });
    info!("Loaded configuration: {:?}", config);

    let db_pool = db::connect(&config.database_url).await?;
    db::migrate(&db_pool).await?;

    info!("Database migrated successfully");

    let state = Data::new(AppState::new(
        db_pool,
        TokenKeys::new(
            config.jwt_secret.as_bytes(),
            chrono::Duration::hours(config.jwt_ttl_hours),
        ),
        config.seed_demo_data,
    ));

    info!(
        "Starting HTTP server on http://{}:{}/",
        config.host, config.port
    );

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(routes::health_handler)
            .service(web::scope("/api").configure(routes::configure))
            .default_service(web::to(default_handler))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

async fn default_handler() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound("Route not found".to_owned()))
}
