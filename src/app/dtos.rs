use crate::db::entities::*;
use crate::utils::time_utils;
use serde::{Deserialize, Serialize};

// Entity -> DTO conversions use the From trait so the
// handlers can stay short. Timestamps become RFC 3339
// strings on the way out.

/* --- Request body or query objects --- */

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
  pub username: String,
  pub email: String,
  pub password: String
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
  pub email: String,
  pub password: String
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateForm {
  pub username: Option<String>,
  pub bio: Option<String>
}

#[derive(Debug, Deserialize)]
pub struct BlogForm {
  pub title: String,
  pub content: String,
  pub tags: Option<Vec<String>>
}

#[derive(Debug, Deserialize)]
pub struct BlogUpdateForm {
  pub title: Option<String>,
  pub content: Option<String>,
  pub tags: Option<Vec<String>>
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
  pub content: String
}

#[derive(Debug, Deserialize)]
pub struct AiPromptForm {
  pub prompt: String
}

#[derive(Debug, Deserialize)]
pub struct MyBlogsQuery {
  pub page: Option<i64>,
  pub limit: Option<i64>
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
  pub limit: Option<i64>
}

// Tags arrive as one comma separated string, like the old
// API did it.
#[derive(Debug, Deserialize)]
pub struct FilterQuery {
  pub tags: Option<String>,
  pub date_from: Option<String>,
  pub date_to: Option<String>,
  pub popularity_sort: Option<String>,
  pub sort_order: Option<String>,
  pub limit: Option<i64>,
  pub skip: Option<i64>,
  pub page: Option<i64>
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
  pub title: Option<String>,
  pub author: Option<String>,
  pub limit: Option<i64>,
  pub skip: Option<i64>,
  pub page: Option<i64>
}

/* --- Response objects --- */

#[derive(Debug, Serialize)]
pub struct TokenDto {
  pub token: String,
  pub user_id: i64,
  pub expires: String
}

// Never carries the password hash or salt anywhere near
// a JSON response.
#[derive(Debug, Serialize)]
pub struct ProfileDto {
  pub id: i64,
  pub username: String,
  pub email: String,
  pub role: String,
  pub bio: Option<String>,
  pub created_at: String,
  pub updated_at: String
}

impl From<User> for ProfileDto {
  fn from(user: User) -> Self {
    Self {
      id: user.id,
      username: user.username,
      email: user.email,
      role: user.role,
      bio: user.bio,
      created_at: time_utils::timestamp_to_rfc3339(user.created_at),
      updated_at: time_utils::timestamp_to_rfc3339(user.updated_at)
    }
  }
}

#[derive(Debug, Serialize)]
pub struct BlogDto {
  pub id: i64,
  pub user_id: i64,
  pub title: String,
  pub content: String,
  pub tags: Vec<String>,
  pub like_count: i64,
  pub dislike_count: i64,
  pub view_count: i64,
  pub created_at: String,
  pub updated_at: String
}

impl From<Blog> for BlogDto {
  fn from(blog: Blog) -> Self {
    Self {
      id: blog.id,
      user_id: blog.user_id,
      title: blog.title,
      content: blog.content,
      tags: blog.tags,
      like_count: blog.like_count,
      dislike_count: blog.dislike_count,
      view_count: blog.view_count,
      created_at: time_utils::timestamp_to_rfc3339(blog.created_at),
      updated_at: time_utils::timestamp_to_rfc3339(blog.updated_at)
    }
  }
}

#[derive(Debug, Serialize)]
pub struct BlogWithAuthorDto {
  #[serde(flatten)]
  pub blog: BlogDto,
  pub author_name: String
}

impl From<BlogWithAuthor> for BlogWithAuthorDto {
  fn from(result: BlogWithAuthor) -> Self {
    Self {
      blog: result.blog.into(),
      author_name: result.author_name
    }
  }
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
  pub id: i64,
  pub blog_id: i64,
  pub user_id: i64,
  pub content: String,
  pub created_at: String,
  pub updated_at: String
}

impl From<Comment> for CommentDto {
  fn from(comment: Comment) -> Self {
    Self {
      id: comment.id,
      blog_id: comment.blog_id,
      user_id: comment.user_id,
      content: comment.content,
      created_at: time_utils::timestamp_to_rfc3339(comment.created_at),
      updated_at: time_utils::timestamp_to_rfc3339(comment.updated_at)
    }
  }
}

#[derive(Debug, Serialize)]
pub struct PopularBlogDto {
  #[serde(flatten)]
  pub blog: BlogDto,
  pub comment_count: i64,
  pub popularity_score: f64
}

#[derive(Debug, Serialize)]
pub struct FilterResponseDto {
  pub blogs: Vec<BlogDto>,
  pub count: usize,
  pub total_count: i64,
  pub page: i64,
  pub limit: i64
}

#[derive(Debug, Serialize)]
pub struct SearchQueryDto {
  pub title: Option<String>,
  pub author: Option<String>,
  pub limit: i64,
  pub skip: i64
}

#[derive(Debug, Serialize)]
pub struct SearchResponseDto {
  pub blogs: Vec<BlogWithAuthorDto>,
  pub count: usize,
  pub total_count: i64,
  pub query: SearchQueryDto
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blog_to_dto() {
    let sut = Blog {
      id: 12,
      user_id: 3,
      title: "Some title".to_string(),
      content: "Some content".to_string(),
      tags: vec!["rust".to_string()],
      like_count: 4,
      dislike_count: 1,
      view_count: 100,
      created_at: 1704067200,
      updated_at: 1704067200
    };
    let dto: BlogDto = sut.into();
    assert_eq!(12, dto.id);
    assert_eq!("2024-01-01T00:00:00+00:00", dto.created_at);
  }

  #[test]
  fn user_to_profile_dto_drops_secrets() {
    let sut = User {
      id: 7,
      username: "franck".to_string(),
      email: "franck@example.com".to_string(),
      password_hash: "supersecret".to_string(),
      salt: "pepper".to_string(),
      role: ROLE_USER.to_string(),
      bio: None,
      created_at: 1704067200,
      updated_at: 1704067200
    };
    let dto: ProfileDto = sut.into();
    let json = serde_json::to_string(&dto).unwrap();
    assert!(!json.contains("supersecret"));
    assert!(!json.contains("pepper"));
  }
}
