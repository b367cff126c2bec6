use super::entities::InteractionKind;
use color_eyre::Result;
use eyre::WrapErr;
use rusqlite::{params, Connection};

// Everything in here takes a Connection instead of the
// pool: the interaction engine wraps each multi-step
// operation (log write + counter bump) in one transaction
// and a rusqlite Transaction derefs to a Connection.

// Who is performing a view. Authenticated users are
// tracked by id, anonymous ones by their
// ip address + user-agent fingerprint.
#[derive(Debug, Clone)]
pub enum Viewer {
  User(i64),
  Anonymous {
    ip_address: String,
    user_agent: String
  }
}

pub fn has_interaction(
  conn: &Connection,
  blog_id: i64,
  user_id: i64,
  kind: InteractionKind
) -> Result<bool> {
  let mut stmt = conn.prepare(
    "SELECT 1 FROM interactions
    WHERE blog_id = ? AND user_id = ? AND kind = ?"
  )?;
  stmt.exists(params![blog_id, user_id, kind.as_str()])
    .context("Check interaction existence")
}

pub fn add_interaction(
  conn: &Connection,
  blog_id: i64,
  user_id: Option<i64>,
  ip_address: Option<&str>,
  user_agent: Option<&str>,
  kind: InteractionKind,
  expires: Option<i64>,
  created_at: i64
) -> Result<()> {
  conn.execute(
    "INSERT INTO interactions
    (blog_id, user_id, ip_address, user_agent, kind, expires, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)",
    params![
      blog_id,
      user_id,
      ip_address,
      user_agent,
      kind.as_str(),
      expires,
      created_at
    ]
  ).context("Insert interaction")?;
  Ok(())
}

pub fn remove_interaction(
  conn: &Connection,
  blog_id: i64,
  user_id: i64,
  kind: InteractionKind
) -> Result<()> {
  conn.execute(
    "DELETE FROM interactions
    WHERE blog_id = ? AND user_id = ? AND kind = ?",
    params![blog_id, user_id, kind.as_str()]
  ).context("Delete interaction")?;
  Ok(())
}

// An unexpired view for the same identity means the view
// is a duplicate within the debounce window.
pub fn has_recent_view(
  conn: &Connection,
  blog_id: i64,
  viewer: &Viewer,
  now: i64
) -> Result<bool> {
  match viewer {
    Viewer::User(user_id) => {
      let mut stmt = conn.prepare(
        "SELECT 1 FROM interactions
        WHERE blog_id = ? AND kind = 'view' AND expires > ?
        AND user_id = ?"
      )?;
      stmt.exists(params![blog_id, now, user_id])
        .context("Check recent view (user)")
    },
    Viewer::Anonymous { ip_address, user_agent } => {
      let mut stmt = conn.prepare(
        "SELECT 1 FROM interactions
        WHERE blog_id = ? AND kind = 'view' AND expires > ?
        AND user_id IS NULL AND ip_address = ? AND user_agent = ?"
      )?;
      stmt.exists(params![blog_id, now, ip_address, user_agent])
        .context("Check recent view (anonymous)")
    }
  }
}

pub fn count_interactions(
  conn: &Connection,
  blog_id: i64,
  kind: InteractionKind
) -> Result<i64> {
  let mut stmt = conn.prepare(
    "SELECT count(*) FROM interactions WHERE blog_id = ? AND kind = ?"
  )?;
  let count: i64 =
    stmt.query_row(params![blog_id, kind.as_str()], |row| row.get(0))?;
  Ok(count)
}
