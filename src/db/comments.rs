use super::entities::Comment;
use super::mappers::map_comment;
use super::Pool;
use color_eyre::Result;
use eyre::WrapErr;
use rusqlite::{params, OptionalExtension};

const COMMENT_FIELDS: &'static str =
  "id, blog_id, user_id, content, created_at, updated_at";

pub fn insert_comment(pool: &Pool, comment: &mut Comment) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO comments (blog_id, user_id, content, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?)",
    params![
      comment.blog_id,
      comment.user_id,
      comment.content,
      comment.created_at,
      comment.updated_at
    ]
  ).context("Insert comment")?;
  comment.id = conn.last_insert_rowid();
  Ok(())
}

pub fn comments_by_blog(pool: &Pool, blog_id: i64) -> Result<Vec<Comment>> {
  super::select_many(
    pool,
    &format!(
      "SELECT {} FROM comments WHERE blog_id = ? ORDER BY created_at ASC",
      COMMENT_FIELDS
    ),
    params![blog_id],
    map_comment
  )
}

pub fn comment_by_id(pool: &Pool, id: i64) -> Result<Option<Comment>> {
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(
    &format!("SELECT {} FROM comments WHERE id = ?", COMMENT_FIELDS)
  )?;
  stmt.query_row(params![id], map_comment)
    .optional()
    .context("Select comment by id")
}

pub fn update_comment(
  pool: &Pool,
  id: i64,
  content: &str,
  updated_at: i64
) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "UPDATE comments SET content = ?, updated_at = ? WHERE id = ?",
    params![content, updated_at, id]
  ).context("Update comment")?;
  Ok(())
}

pub fn delete_comment(pool: &Pool, id: i64) -> Result<bool> {
  let conn = pool.clone().get()?;
  let deleted = conn
    .execute("DELETE FROM comments WHERE id = ?", params![id])
    .context("Delete comment")?;
  Ok(deleted > 0)
}

// Feeds the popularity score. One small query per blog,
// same as the old backend did.
pub fn comment_count(pool: &Pool, blog_id: i64) -> Result<i64> {
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(
    "SELECT count(*) FROM comments WHERE blog_id = ?"
  )?;
  let count: i64 = stmt.query_row(params![blog_id], |row| row.get(0))?;
  Ok(count)
}
