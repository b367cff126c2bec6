use super::entities::User;
use super::mappers::map_user;
use super::Pool;
use color_eyre::Result;
use eyre::WrapErr;
use rusqlite::{params, OptionalExtension};

const USER_FIELDS: &'static str =
  "id, username, email, password_hash, salt, role, bio, created_at, updated_at";

pub fn insert_user(pool: &Pool, user: &mut User) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO users
    (username, email, password_hash, salt, role, bio, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    params![
      user.username,
      user.email,
      user.password_hash,
      user.salt,
      user.role,
      user.bio,
      user.created_at,
      user.updated_at
    ]
  ).context("Insert user")?;
  user.id = conn.last_insert_rowid();
  Ok(())
}

pub fn user_by_id(pool: &Pool, id: i64) -> Result<Option<User>> {
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(
    &format!("SELECT {} FROM users WHERE id = ?", USER_FIELDS)
  )?;
  stmt.query_row(params![id], map_user)
    .optional()
    .context("Select user by id")
}

pub fn user_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(
    &format!("SELECT {} FROM users WHERE email = ?", USER_FIELDS)
  )?;
  stmt.query_row(params![email], map_user)
    .optional()
    .context("Select user by email")
}

// Partial update: only the fields the caller actually
// provided get touched.
pub fn update_profile(
  pool: &Pool,
  user_id: i64,
  username: Option<&str>,
  bio: Option<&str>,
  updated_at: i64
) -> Result<()> {
  let conn = pool.clone().get()?;
  if let Some(name) = username {
    conn.execute(
      "UPDATE users SET username = ?, updated_at = ? WHERE id = ?",
      params![name, updated_at, user_id]
    ).context("Update username")?;
  }
  if let Some(bio) = bio {
    conn.execute(
      "UPDATE users SET bio = ?, updated_at = ? WHERE id = ?",
      params![bio, updated_at, user_id]
    ).context("Update bio")?;
  }
  Ok(())
}

pub fn insert_session(
  pool: &Pool,
  token: &str,
  user_id: i64,
  expires: i64
) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO sessions (token, user_id, expires) VALUES (?, ?, ?)",
    params![token, user_id, expires]
  ).context("Insert session")?;
  Ok(())
}

// Resolves a session token straight to its user, skipping
// expired sessions. Expired rows get cleaned up lazily on
// login, see purge_expired_sessions.
pub fn session_user(pool: &Pool, token: &str, now: i64) -> Result<Option<User>> {
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(
    &format!(
      "SELECT {} FROM users
      WHERE id = (SELECT user_id FROM sessions WHERE token = ? AND expires > ?)",
      USER_FIELDS
    )
  )?;
  stmt.query_row(params![token, now], map_user)
    .optional()
    .context("Select session user")
}

pub fn delete_session(pool: &Pool, token: &str) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute("DELETE FROM sessions WHERE token = ?", params![token])
    .context("Delete session")?;
  Ok(())
}

pub fn purge_expired_sessions(pool: &Pool, now: i64) -> Result<usize> {
  let conn = pool.clone().get()?;
  conn.execute("DELETE FROM sessions WHERE expires <= ?", params![now])
    .context("Purge expired sessions")
}
