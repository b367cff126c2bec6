use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, info};
// I think we have to add crate here because
// of the other crate named "config" that we
// use as a dependency.
use crate::config::{AiSettings, Config};
use crate::db::{self, Pool};

mod ai;
mod auth;
mod dtos;
mod error;
mod filtering;
mod handlers;
mod helpers;
mod interactions;
mod popularity;

pub struct AppState {
  pub pool: Pool,
  pub session_ttl: i64,
  pub ai: AiSettings
}

// Function to start the server.
// Has to be async because there should be a .await at the end.
pub async fn run() -> Result<()> {
  let config = Config::from_env()
    .expect("Configuration (environment or .env file) is missing");
  debug!("Current config: {:?}", config);

  let pool = db::open(&config.db_path, config.busy_timeout_ms)
    .expect("Database connection failed");
  db::init_schema(&pool)?;

  let bind_address = config.bind_address.clone();
  let app_state = web::Data::new(AppState {
    pool,
    session_ttl: config.session_ttl,
    ai: AiSettings::from(&config)
  });

  info!("Starting server on {}", bind_address);
  HttpServer::new(move || {
    App::new()
      .app_data(app_state.clone())
      .app_data(web::PathConfig::default().error_handler(|_, _| {
        // No idea how this works but it does:
        actix_web::error::ErrorBadRequest("Invalid path arguments")
      }))
      .app_data(web::QueryConfig::default().error_handler(|_, _| {
        actix_web::error::ErrorBadRequest("Invalid query string arguments")
      }))
      // The API is meant to sit behind arbitrary frontends.
      .wrap(Cors::permissive())
      .wrap(middleware::Logger::default())
      .service(web::scope("/api/v1").configure(base_endpoints_config))
      .default_service(web::route().to(handlers::not_found))
  })
  .bind(bind_address)?
  .run()
  .await
  .context("Start Actix web server")
}

// Route configuration. The fixed /blogs/... segments have
// to be registered before /blogs/{id} or the path matcher
// would try to parse "popular" as an id.
fn base_endpoints_config(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/auth/register", web::post().to(handlers::register))
    .route("/auth/login", web::post().to(handlers::login))
    .route("/auth/logout", web::post().to(handlers::logout))
    .route("/profile", web::get().to(handlers::profile))
    .route("/profile", web::put().to(handlers::update_profile))
    .route("/blogs", web::post().to(handlers::create_blog))
    .route("/blogs", web::get().to(handlers::my_blogs))
    .route("/blogs/popular", web::get().to(handlers::popular_blogs))
    .route("/blogs/filter", web::get().to(handlers::filter_blogs))
    .route("/blogs/search", web::get().to(handlers::search_blogs))
    .route("/blogs/{id}", web::get().to(handlers::blog_by_id))
    .route("/blogs/{id}", web::put().to(handlers::update_blog))
    .route("/blogs/{id}", web::delete().to(handlers::delete_blog))
    .route("/blogs/{id}/like", web::post().to(handlers::like_blog))
    .route("/blogs/{id}/dislike", web::post().to(handlers::dislike_blog))
    .route("/blogs/{id}/view", web::post().to(handlers::view_blog))
    .route("/blogs/{id}/comments", web::post().to(handlers::create_comment))
    .route("/blogs/{id}/comments", web::get().to(handlers::blog_comments))
    .route("/comments/{id}", web::get().to(handlers::comment_by_id))
    .route("/comments/{id}", web::put().to(handlers::update_comment))
    .route("/comments/{id}", web::delete().to(handlers::delete_comment))
    .route("/ai/generate", web::post().to(handlers::generate_blog));
}
