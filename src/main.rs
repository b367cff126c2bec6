mod app;
mod config;
mod db;
mod utils;

use color_eyre::Result;

#[actix_web::main]
async fn main() -> Result<()> {
  dotenv::dotenv().ok();
  // Default to info level logging unless overridden:
  if std::env::var("RUST_LOG").is_err() {
    std::env::set_var("RUST_LOG", "info");
  }
  env_logger::init();

  app::run().await
}
