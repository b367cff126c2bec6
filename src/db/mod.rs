use color_eyre::Result;
use eyre::WrapErr;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Row, ToSql};
use std::time::Duration;

pub mod entities;
mod mappers;
pub mod queries;

pub mod blogs;
pub mod comments;
pub mod interactions;
pub mod users;

// Type alias to make function signatures much clearer:
pub type Pool = r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>;

// Open the pool with a busy timeout on every connection so
// a request waiting on a locked database gives up after a
// bounded amount of time instead of hanging forever.
pub fn open(db_path: &str, busy_timeout_ms: u64) -> Result<Pool> {
  let manager = SqliteConnectionManager::file(db_path)
    .with_init(move |conn| {
      conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
      conn.execute_batch("PRAGMA foreign_keys = ON;")
    });
  Pool::new(manager).context("Database connection pool")
}

// Schema setup is idempotent and runs at every startup.
pub fn init_schema(pool: &Pool) -> Result<()> {
  let conn = pool.clone().get()?;
  conn
    .execute_batch(
      "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        salt TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        bio TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
      );
      CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL,
        expires INTEGER NOT NULL
      );
      CREATE TABLE IF NOT EXISTS blogs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        like_count INTEGER NOT NULL DEFAULT 0,
        dislike_count INTEGER NOT NULL DEFAULT 0,
        view_count INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
      );
      CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
      );
      CREATE TABLE IF NOT EXISTS blog_tags (
        blog_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (blog_id, tag_id)
      );
      CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        blog_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
      );
      CREATE TABLE IF NOT EXISTS interactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        blog_id INTEGER NOT NULL,
        user_id INTEGER,
        ip_address TEXT,
        user_agent TEXT,
        kind TEXT NOT NULL,
        expires INTEGER,
        created_at INTEGER NOT NULL
      );
      CREATE INDEX IF NOT EXISTS idx_interactions_blog_kind
        ON interactions (blog_id, kind);
      CREATE INDEX IF NOT EXISTS idx_comments_blog
        ON comments (blog_id);
      CREATE INDEX IF NOT EXISTS idx_sessions_expires
        ON sessions (expires);"
    )
    .context("Creating database schema")
}

// Stole most of the signature from the rusqlite doc.
fn select_many<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> Result<Vec<T>>
  where
    P: IntoIterator,
    P::Item: ToSql,
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  // Do the reference counting thing and get a connection
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(query)?;
  stmt.query_map(params, mapper)
    .and_then(Iterator::collect)
    .context("Generic select_many query")
}

// Every engine test runs against its own in-memory SQLite
// database. max_size has to be 1 because each new pooled
// connection to :memory: would otherwise get a fresh empty
// database.
#[cfg(test)]
pub fn test_pool() -> Pool {
  let manager = SqliteConnectionManager::memory();
  let pool = Pool::builder()
    .max_size(1)
    .build(manager)
    .expect("In-memory database failed");
  init_schema(&pool).expect("Schema creation failed");
  pool
}
