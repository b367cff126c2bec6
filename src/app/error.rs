use actix_web::{error::ResponseError, HttpResponse};
use derive_more::Display;
use log::error;
use serde::Serialize;

// The full messages of the 500 family only ever show up in
// logs, random internet people get the generic line.
#[derive(Debug, Display)]
pub enum Error {
  #[display(fmt = "Internal server error")]
  InternalServerError(String),
  #[display(fmt = "Database error")]
  DatabaseError(String),
  #[display(fmt = "{}", _0)]
  BadRequest(String),
  #[display(fmt = "{}", _0)]
  Unauthorized(String),
  #[display(fmt = "{}", _0)]
  Forbidden(String),
  #[display(fmt = "{}", _0)]
  NotFound(String)
}

// Every error body is JSON with a single "error" field,
// the status code carries the rest of the information.
#[derive(Serialize)]
struct ErrorBody {
  error: String
}

impl ResponseError for Error {
  fn error_response(&self) -> HttpResponse {
    let body = ErrorBody {
      error: self.to_string()
    };
    match self {
      Error::InternalServerError(detail) | Error::DatabaseError(detail) => {
        error!("Internal error reached a handler - {}", detail);
        HttpResponse::InternalServerError().json(body)
      },
      Error::BadRequest(_) => HttpResponse::BadRequest().json(body),
      Error::Unauthorized(_) => HttpResponse::Unauthorized().json(body),
      Error::Forbidden(_) => HttpResponse::Forbidden().json(body),
      Error::NotFound(_) => HttpResponse::NotFound().json(body)
    }
  }
}

// Maps whatever the db layer reports into our
// DatabaseError. Generic because eyre reports aren't one
// single concrete type across the color-eyre re-exports.
pub fn map_db_error<E: std::fmt::Display>(e: E) -> Error {
  Error::DatabaseError(e.to_string())
}
