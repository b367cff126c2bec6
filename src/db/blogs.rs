use super::entities::{Blog, BlogWithAuthor};
use super::mappers::{map_blog, map_blog_with_author};
use super::queries::{generate_in_placeholders, select_query_builder, Order, OrderBy};
use super::Pool;
use color_eyre::Result;
use eyre::WrapErr;
use rusqlite::{params, Connection, OptionalExtension, ToSql};

const BLOG_FIELDS: [&'static str; 9] = [
  "blogs.id",
  "blogs.user_id",
  "blogs.title",
  "blogs.content",
  "blogs.like_count",
  "blogs.dislike_count",
  "blogs.view_count",
  "blogs.created_at",
  "blogs.updated_at"
];

// Sort keys accepted by the filter endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  Views,
  Likes,
  Dislikes,
  Engagement
}

impl SortKey {
  pub fn parse(value: &str) -> Option<SortKey> {
    match value {
      "views" => Some(SortKey::Views),
      "likes" => Some(SortKey::Likes),
      "dislikes" => Some(SortKey::Dislikes),
      "engagement" => Some(SortKey::Engagement),
      _ => None
    }
  }

  pub fn sort_field(&self) -> &'static str {
    match self {
      SortKey::Views => "blogs.view_count",
      SortKey::Likes => "blogs.like_count",
      SortKey::Dislikes => "blogs.dislike_count",
      // "engagement" sorts by likes. Known limitation
      // inherited from the previous API, kept on purpose
      // so both backends return the same pages.
      SortKey::Engagement => "blogs.like_count"
    }
  }
}

// Already validated filter. The app::filtering module is
// responsible for building one of these from the raw
// query string parameters.
#[derive(Debug)]
pub struct BlogFilter {
  pub tags: Vec<String>,
  pub date_from: Option<i64>,
  pub date_to: Option<i64>,
  pub sort_key: Option<SortKey>,
  pub sort_order: Order,
  pub limit: i64,
  pub skip: i64
}

#[derive(Debug)]
pub struct BlogSearch {
  pub title: Option<String>,
  pub author: Option<String>,
  pub limit: i64,
  pub skip: i64
}

pub fn insert_blog(pool: &Pool, blog: &mut Blog) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO blogs
    (user_id, title, content, like_count, dislike_count, view_count,
    created_at, updated_at)
    VALUES (?, ?, ?, 0, 0, 0, ?, ?)",
    params![
      blog.user_id,
      blog.title,
      blog.content,
      blog.created_at,
      blog.updated_at
    ]
  ).context("Insert blog")?;
  blog.id = conn.last_insert_rowid();
  set_blog_tags(&conn, blog.id, &blog.tags)?;
  Ok(())
}

pub fn blog_by_id(pool: &Pool, id: i64) -> Result<Option<Blog>> {
  let conn = pool.clone().get()?;
  let query = select_query_builder(
    &BLOG_FIELDS,
    "blogs",
    &["blogs.id = ?".to_string()],
    None,
    None,
    None
  );
  let blog = conn.prepare(&query)?
    .query_row(params![id], map_blog)
    .optional()
    .context("Select blog by id")?;
  match blog {
    Some(mut blog) => {
      blog.tags = tags_for_blog(&conn, blog.id)?;
      Ok(Some(blog))
    },
    None => Ok(None)
  }
}

// Paginated listing of one user's blogs, newest first.
pub fn blogs_by_user(
  pool: &Pool,
  user_id: i64,
  page: i64,
  limit: i64
) -> Result<Vec<Blog>> {
  let page = if page < 1 { 1 } else { page };
  // Saturate instead of overflowing on absurd page
  // numbers, an OFFSET past the end just returns nothing.
  let skip = (page - 1).saturating_mul(limit);
  let query = select_query_builder(
    &BLOG_FIELDS,
    "blogs",
    &["blogs.user_id = ?".to_string()],
    Some(OrderBy::new(Order::Desc, "blogs.created_at".to_string())),
    Some(limit),
    Some(skip)
  );
  let mut blogs = super::select_many(pool, &query, params![user_id], map_blog)?;
  let conn = pool.clone().get()?;
  for blog in blogs.iter_mut() {
    blog.tags = tags_for_blog(&conn, blog.id)?;
  }
  Ok(blogs)
}

// The popularity engine scores every blog there is, so
// this really fetches everything.
pub fn all_blogs(pool: &Pool) -> Result<Vec<Blog>> {
  let query = select_query_builder(
    &BLOG_FIELDS,
    "blogs",
    &[],
    Some(OrderBy::new(Order::Asc, "blogs.id".to_string())),
    None,
    None
  );
  let mut blogs = super::select_many(pool, &query, rusqlite::NO_PARAMS, map_blog)?;
  let conn = pool.clone().get()?;
  for blog in blogs.iter_mut() {
    blog.tags = tags_for_blog(&conn, blog.id)?;
  }
  Ok(blogs)
}

// Content edits only ever touch the fields present in the
// request. Counters have their own single-statement
// relative update below and the two must never overlap,
// or a concurrent like could get clobbered.
pub fn update_blog_fields(
  pool: &Pool,
  id: i64,
  title: Option<&str>,
  content: Option<&str>,
  tags: Option<&[String]>,
  updated_at: i64
) -> Result<()> {
  let conn = pool.clone().get()?;
  if let Some(title) = title {
    conn.execute(
      "UPDATE blogs SET title = ?, updated_at = ? WHERE id = ?",
      params![title, updated_at, id]
    ).context("Update blog title")?;
  }
  if let Some(content) = content {
    conn.execute(
      "UPDATE blogs SET content = ?, updated_at = ? WHERE id = ?",
      params![content, updated_at, id]
    ).context("Update blog content")?;
  }
  if let Some(tags) = tags {
    set_blog_tags(&conn, id, tags)?;
    conn.execute(
      "UPDATE blogs SET updated_at = ? WHERE id = ?",
      params![updated_at, id]
    ).context("Update blog timestamp")?;
  }
  Ok(())
}

pub fn delete_blog(pool: &Pool, id: i64) -> Result<bool> {
  let conn = pool.clone().get()?;
  conn.execute("DELETE FROM blog_tags WHERE blog_id = ?", params![id])
    .context("Delete blog tags")?;
  let deleted = conn
    .execute("DELETE FROM blogs WHERE id = ?", params![id])
    .context("Delete blog")?;
  Ok(deleted > 0)
}

// The single place that mutates counters. Relative update
// in one statement, so concurrent interactions can't lose
// each other's increments. Takes a Connection instead of
// the pool because the interaction engine calls it inside
// a transaction.
pub fn bump_counters(
  conn: &Connection,
  blog_id: i64,
  like_delta: i64,
  dislike_delta: i64,
  view_delta: i64
) -> Result<()> {
  conn.execute(
    "UPDATE blogs SET
    like_count = like_count + ?,
    dislike_count = dislike_count + ?,
    view_count = view_count + ?
    WHERE id = ?",
    params![like_delta, dislike_delta, view_delta, blog_id]
  ).context("Bump blog counters")?;
  Ok(())
}

pub fn filter_blogs(pool: &Pool, filter: &BlogFilter) -> Result<(Vec<Blog>, i64)> {
  let mut where_parts: Vec<String> = Vec::new();
  let mut owned_params: Vec<Box<dyn ToSql>> = Vec::new();

  if !filter.tags.is_empty() {
    // OR-match on tags: any blog carrying at least one of
    // the requested tags goes through.
    where_parts.push(format!(
      "blogs.id IN (SELECT blog_tags.blog_id FROM blog_tags
      JOIN tags ON tags.id = blog_tags.tag_id
      WHERE tags.name IN {})",
      generate_in_placeholders(filter.tags.len())
    ));
    for tag in &filter.tags {
      owned_params.push(Box::new(tag.clone()));
    }
  }
  if let Some(from) = filter.date_from {
    where_parts.push("blogs.created_at >= ?".to_string());
    owned_params.push(Box::new(from));
  }
  if let Some(to) = filter.date_to {
    where_parts.push("blogs.created_at <= ?".to_string());
    owned_params.push(Box::new(to));
  }

  let order = match &filter.sort_key {
    Some(key) => OrderBy::new(filter.sort_order, key.sort_field().to_string()),
    // Default ordering when no popularity sort was asked:
    None => OrderBy::new(Order::Desc, "blogs.created_at".to_string())
  };

  let conn = pool.clone().get()?;
  let param_refs: Vec<&dyn ToSql> =
    owned_params.iter().map(|p| p.as_ref()).collect();

  let count_query =
    select_query_builder(&["count(*)"], "blogs", &where_parts, None, None, None);
  let total_count: i64 = conn.prepare(&count_query)?
    .query_row(&param_refs, |row| row.get(0))
    .context("Count filtered blogs")?;

  let query = select_query_builder(
    &BLOG_FIELDS,
    "blogs",
    &where_parts,
    Some(order),
    Some(filter.limit),
    if filter.skip > 0 { Some(filter.skip) } else { None }
  );
  let mut stmt = conn.prepare(&query)?;
  let mut blogs: Vec<Blog> = stmt
    .query_map(&param_refs, map_blog)
    .and_then(Iterator::collect)
    .context("Select filtered blogs")?;
  for blog in blogs.iter_mut() {
    blog.tags = tags_for_blog(&conn, blog.id)?;
  }
  Ok((blogs, total_count))
}

pub fn search_blogs(
  pool: &Pool,
  search: &BlogSearch
) -> Result<(Vec<BlogWithAuthor>, i64)> {
  let mut where_parts: Vec<String> = Vec::new();
  let mut owned_params: Vec<Box<dyn ToSql>> = Vec::new();

  // SQLite LIKE is already case-insensitive for ASCII,
  // which matches the old case-insensitive regexes.
  if let Some(title) = &search.title {
    where_parts.push("blogs.title LIKE ?".to_string());
    owned_params.push(Box::new(format!("%{}%", title)));
  }
  if let Some(author) = &search.author {
    // The IFNULL mirrors the old behavior where blogs with
    // a missing author were searchable as "Unknown Author".
    where_parts.push(
      "IFNULL(users.username, 'Unknown Author') LIKE ?".to_string()
    );
    owned_params.push(Box::new(format!("%{}%", author)));
  }

  let from = "blogs LEFT JOIN users ON users.id = blogs.user_id";
  let conn = pool.clone().get()?;
  let param_refs: Vec<&dyn ToSql> =
    owned_params.iter().map(|p| p.as_ref()).collect();

  let count_query =
    select_query_builder(&["count(*)"], from, &where_parts, None, None, None);
  let total_count: i64 = conn.prepare(&count_query)?
    .query_row(&param_refs, |row| row.get(0))
    .context("Count searched blogs")?;

  let mut fields: Vec<&str> = BLOG_FIELDS.to_vec();
  fields.push("users.username");
  let query = select_query_builder(
    &fields,
    from,
    &where_parts,
    Some(OrderBy::new(Order::Desc, "blogs.created_at".to_string())),
    Some(search.limit),
    if search.skip > 0 { Some(search.skip) } else { None }
  );
  let mut stmt = conn.prepare(&query)?;
  let mut results: Vec<BlogWithAuthor> = stmt
    .query_map(&param_refs, map_blog_with_author)
    .and_then(Iterator::collect)
    .context("Select searched blogs")?;
  for result in results.iter_mut() {
    result.blog.tags = tags_for_blog(&conn, result.blog.id)?;
  }
  Ok((results, total_count))
}

fn tags_for_blog(conn: &Connection, blog_id: i64) -> Result<Vec<String>> {
  let mut stmt = conn.prepare(
    "SELECT tags.name FROM blog_tags
    JOIN tags ON tags.id = blog_tags.tag_id
    WHERE blog_tags.blog_id = ?
    ORDER BY tags.name ASC"
  )?;
  stmt.query_map(params![blog_id], |row| row.get(0))
    .and_then(Iterator::collect)
    .context("Select tags for blog")
}

// Replaces the tag links of a blog. Tag names themselves
// are shared rows in the tags table.
fn set_blog_tags(conn: &Connection, blog_id: i64, tags: &[String]) -> Result<()> {
  conn.execute("DELETE FROM blog_tags WHERE blog_id = ?", params![blog_id])
    .context("Clear blog tags")?;
  for tag in tags {
    let tag = tag.trim();
    if tag.is_empty() {
      continue;
    }
    conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?)", params![tag])
      .context("Insert tag")?;
    let tag_id: i64 = conn.query_row(
      "SELECT id FROM tags WHERE name = ?",
      params![tag],
      |row| row.get(0)
    ).context("Select tag id")?;
    conn.execute(
      "INSERT OR IGNORE INTO blog_tags (blog_id, tag_id) VALUES (?, ?)",
      params![blog_id, tag_id]
    ).context("Link blog tag")?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;

  #[test]
  fn listing_with_huge_page_returns_nothing() {
    let pool = db::test_pool();
    let mut blog = Blog {
      id: -1,
      user_id: 1,
      title: "t".to_string(),
      content: "c".to_string(),
      tags: Vec::new(),
      like_count: 0,
      dislike_count: 0,
      view_count: 0,
      created_at: 1000,
      updated_at: 1000
    };
    insert_blog(&pool, &mut blog).unwrap();
    let blogs = blogs_by_user(&pool, 1, i64::MAX, 5).unwrap();
    assert!(blogs.is_empty());
  }
}
