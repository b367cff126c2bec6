use super::entities::*;
use rusqlite::{Error, Row};

pub fn map_user(row: &Row) -> Result<User, Error> {
  Ok(User {
    id: row.get(0)?,
    username: row.get(1)?,
    email: row.get(2)?,
    password_hash: row.get(3)?,
    salt: row.get(4)?,
    role: row.get(5)?,
    bio: row.get(6)?,
    created_at: row.get(7)?,
    updated_at: row.get(8)?
  })
}

// Tags live in their own table and get filled in by a
// second query, hence the empty Vec here.
pub fn map_blog(row: &Row) -> Result<Blog, Error> {
  Ok(Blog {
    id: row.get(0)?,
    user_id: row.get(1)?,
    title: row.get(2)?,
    content: row.get(3)?,
    like_count: row.get(4)?,
    dislike_count: row.get(5)?,
    view_count: row.get(6)?,
    created_at: row.get(7)?,
    updated_at: row.get(8)?,
    tags: Vec::new()
  })
}

// Same columns as map_blog plus the LEFT JOINed author
// name as the last column.
pub fn map_blog_with_author(row: &Row) -> Result<BlogWithAuthor, Error> {
  let blog = map_blog(row)?;
  let author_name: Option<String> = row.get(9)?;
  Ok(BlogWithAuthor {
    blog,
    author_name: author_name.unwrap_or_else(|| String::from("Unknown Author"))
  })
}

pub fn map_comment(row: &Row) -> Result<Comment, Error> {
  Ok(Comment {
    id: row.get(0)?,
    blog_id: row.get(1)?,
    user_id: row.get(2)?,
    content: row.get(3)?,
    created_at: row.get(4)?,
    updated_at: row.get(5)?
  })
}
