// Adding the context method to errors:
use color_eyre::Result;
use eyre::WrapErr;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
  pub db_path: String,
  pub bind_address: String,
  // Session token lifetime, seconds:
  pub session_ttl: i64,
  // Upper bound for waiting on a locked database, the
  // rough equivalent of the per-request deadline the old
  // backend put on every store call:
  pub busy_timeout_ms: u64,
  // AI content generation settings. The endpoint refuses
  // to work with an empty api key:
  pub ai_api_url: String,
  pub ai_api_key: String,
  pub ai_model: String
}

// The AI settings travel into the app state on their own
// so the rest of the config doesn't have to.
#[derive(Debug, Clone)]
pub struct AiSettings {
  pub api_url: String,
  pub api_key: String,
  pub model: String
}

impl From<&Config> for AiSettings {
  fn from(config: &Config) -> Self {
    Self {
      api_url: config.ai_api_url.clone(),
      api_key: config.ai_api_key.clone(),
      model: config.ai_model.clone()
    }
  }
}

impl Config {

  pub fn from_env() -> Result<Config> {
    let mut c = config::Config::new();
    // You have to use lowercase here when compared to
    // what's in the .env file.
    c.set_default("db_path", "./inkpost.db")?;
    c.set_default("bind_address", "127.0.0.1:8080")?;
    // 7 days:
    c.set_default("session_ttl", 604800)?;
    c.set_default("busy_timeout_ms", 10000)?;
    c.set_default("ai_api_url", "https://openrouter.ai/api/v1/chat/completions")?;
    c.set_default("ai_api_key", "")?;
    c.set_default("ai_model", "openai/gpt-4o-mini")?;

    c.merge(config::Environment::default())?;
    // The error has to be given a context for
    // color_eyre to work here:
    c.try_into()
      .context("Loading configuration from env")
  }

}
