use super::error::Error;
use crate::config::AiSettings;
use crate::utils::text_utils;
use actix_web::client::Client;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

// Draft generation through an OpenAI-compatible chat
// completions endpoint. We only ever send one message and
// read one choice back, so the request and response types
// stay minimal.

const REQUEST_TIMEOUT_SECS: u64 = 10;
// Completions sometimes open with a whole paragraph
// instead of a title sentence.
const MAX_TITLE_LENGTH: usize = 120;

lazy_static! {
  // First sentence or first line of the completion,
  // whichever ends sooner.
  static ref TITLE_REGEX: Regex = Regex::new("^(.*?)(\\.|\n|$)").unwrap();
}

#[derive(Serialize)]
pub struct GeneratedBlog {
  pub title: String,
  pub paragraphs: Vec<String>,
  pub paragraph_count: usize
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessage
}

#[derive(Deserialize)]
struct ChatMessage {
  content: String
}

pub async fn generate_blog(
  settings: &AiSettings,
  prompt: &str
) -> Result<GeneratedBlog, Error> {
  let prompt = prompt.trim();
  if prompt.is_empty() {
    return Err(Error::BadRequest("prompt cannot be empty".to_string()));
  }
  if settings.api_key.is_empty() {
    return Err(Error::InternalServerError(
      "AI service is not configured".to_string()
    ));
  }

  let body = json!({
    "model": settings.model,
    "messages": [
      {
        "role": "user",
        "content": normalize_prompt(prompt)
      }
    ]
  });
  let client = Client::builder()
    .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    .finish();
  let mut response = client
    .post(&settings.api_url)
    .header("Authorization", format!("Bearer {}", settings.api_key))
    .send_json(&body)
    .await
    .map_err(|e| {
      Error::InternalServerError(format!("AI request failed: {}", e))
    })?;
  if !response.status().is_success() {
    return Err(Error::InternalServerError(format!(
      "AI service returned status {}",
      response.status()
    )));
  }
  let parsed: ChatResponse = response.json().await.map_err(|e| {
    Error::InternalServerError(format!("Invalid AI response: {}", e))
  })?;
  let content = parsed
    .choices
    .into_iter()
    .next()
    .map(|c| c.message.content)
    .unwrap_or_default();
  if content.trim().is_empty() {
    return Err(Error::InternalServerError(
      "AI service returned an empty completion".to_string()
    ));
  }

  let paragraphs = split_paragraphs(&content);
  Ok(GeneratedBlog {
    title: extract_title(&content),
    paragraph_count: paragraphs.len(),
    paragraphs
  })
}

// Bare topics get wrapped into an instruction, prompts
// that already ask for a blog go through untouched.
fn normalize_prompt(prompt: &str) -> String {
  if prompt.to_lowercase().contains("blog") {
    prompt.to_string()
  } else {
    format!("Generate a blog regarding: {}", prompt)
  }
}

fn split_paragraphs(content: &str) -> Vec<String> {
  content
    .replace("\r\n", "\n")
    .split("\n\n")
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .map(str::to_string)
    .collect()
}

fn extract_title(content: &str) -> String {
  let content = content.trim();
  let mut title = TITLE_REGEX
    .captures(content)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().trim().to_string())
    .filter(|t| !t.is_empty())
    .unwrap_or_else(|| "Untitled".to_string());
  text_utils::truncate_utf8(&mut title, MAX_TITLE_LENGTH);
  title
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wraps_bare_topics() {
    assert_eq!(
      normalize_prompt("rust memory safety"),
      "Generate a blog regarding: rust memory safety"
    );
    assert_eq!(
      normalize_prompt("Write a blog about ferrets"),
      "Write a blog about ferrets"
    );
  }

  #[test]
  fn splits_on_blank_lines() {
    let content = "First paragraph.\r\n\r\nSecond one.\n\n\n\nThird.";
    assert_eq!(
      split_paragraphs(content),
      vec!["First paragraph.", "Second one.", "Third."]
    );
  }

  #[test]
  fn title_is_first_sentence_or_line() {
    assert_eq!(
      extract_title("Ferrets at home. They are great.\n\nMore text."),
      "Ferrets at home"
    );
    assert_eq!(
      extract_title("A title without a period\nBody starts here"),
      "A title without a period"
    );
    assert_eq!(extract_title("   "), "Untitled");
  }

  #[test]
  fn overlong_titles_get_truncated() {
    let content = "word ".repeat(60);
    assert_eq!(extract_title(&content).chars().count(), MAX_TITLE_LENGTH);
  }
}
