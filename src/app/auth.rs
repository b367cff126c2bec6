use super::error::{map_db_error, Error};
use crate::db::entities::User;
use crate::db::{users, Pool};
use crate::utils::time_utils;
use actix_web::HttpRequest;
use rand::Rng;
use sha1::{Digest, Sha1};

// Iteration count for password stretching. SHA-1 is what
// we have in the dependency tree, so we compensate by
// rehashing a lot. Changing this invalidates every stored
// hash, so don't.
const HASH_ROUNDS: usize = 4096;

pub fn generate_salt() -> String {
  let bytes: [u8; 16] = rand::thread_rng().gen();
  to_hex(&bytes)
}

pub fn generate_token() -> String {
  let bytes: [u8; 32] = rand::thread_rng().gen();
  to_hex(&bytes)
}

pub fn hash_password(password: &str, salt: &str) -> String {
  let mut digest = Vec::new();
  for _ in 0..HASH_ROUNDS {
    let mut hasher = Sha1::new();
    hasher.update(&digest);
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    digest = hasher.finalize().to_vec();
  }
  to_hex(&digest)
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
  hash_password(password, salt) == expected_hash
}

fn to_hex(bytes: &[u8]) -> String {
  bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// Extracting Actix header values is kinda convoluted,
// see also helpers::header_value.
fn bearer_token(req: &HttpRequest) -> Option<String> {
  req.headers().get("authorization")
    .and_then(|h| h.to_str().ok())
    .and_then(|value| {
      if value.len() > 7 && value[..7].eq_ignore_ascii_case("bearer ") {
        Some(value[7..].trim().to_string())
      } else {
        None
      }
    })
}

// Resolves the session token of the request into a user,
// None when there's no token or it's expired. Endpoints
// with optional authentication (the view one) use this
// directly, everything else goes through require_user.
pub fn authenticated_user(
  req: &HttpRequest,
  pool: &Pool
) -> Result<Option<User>, Error> {
  let token = match bearer_token(req) {
    Some(token) => token,
    None => return Ok(None)
  };
  users::session_user(pool, &token, time_utils::current_timestamp())
    .map_err(map_db_error)
}

pub fn require_user(req: &HttpRequest, pool: &Pool) -> Result<User, Error> {
  authenticated_user(req, pool)?
    .ok_or_else(|| Error::Unauthorized(String::from("User not authenticated")))
}

// Returns the session token so logout can delete it.
pub fn require_token(req: &HttpRequest) -> Result<String, Error> {
  bearer_token(req)
    .ok_or_else(|| Error::Unauthorized(String::from("User not authenticated")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_stable_for_same_inputs() {
    let first = hash_password("hunter2", "abcdef");
    let second = hash_password("hunter2", "abcdef");
    assert_eq!(first, second);
    // 20 bytes of SHA-1 as hex:
    assert_eq!(first.len(), 40);
  }

  #[test]
  fn hash_differs_with_salt() {
    assert_ne!(
      hash_password("hunter2", "salt-one"),
      hash_password("hunter2", "salt-two")
    );
  }

  #[test]
  fn verify_rejects_wrong_password() {
    let salt = generate_salt();
    let hash = hash_password("correct horse", &salt);
    assert!(verify_password("correct horse", &salt, &hash));
    assert!(!verify_password("wrong pony", &salt, &hash));
  }

  #[test]
  fn tokens_are_long_and_unique() {
    let t1 = generate_token();
    let t2 = generate_token();
    assert_eq!(t1.len(), 64);
    assert_ne!(t1, t2);
  }
}
