use serde::{Deserialize, Serialize};

// Plain datatypes mirroring the SQLite tables. These are
// not directly what the API sends back, the app module has
// DTO structs for that.

pub const ROLE_USER: &'static str = "user";
pub const ROLE_ADMIN: &'static str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub salt: String,
  pub role: String,
  pub bio: Option<String>,
  pub created_at: i64,
  pub updated_at: i64
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role == ROLE_ADMIN
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
  pub id: i64,
  pub user_id: i64,
  pub title: String,
  pub content: String,
  pub tags: Vec<String>,
  // The three running counters. Only ever mutated through
  // relative single-statement updates, never row rewrites.
  pub like_count: i64,
  pub dislike_count: i64,
  pub view_count: i64,
  pub created_at: i64,
  pub updated_at: i64
}

// Search results carry the resolved author name from the
// users join.
#[derive(Debug)]
pub struct BlogWithAuthor {
  pub blog: Blog,
  pub author_name: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub id: i64,
  pub blog_id: i64,
  pub user_id: i64,
  pub content: String,
  pub created_at: i64,
  pub updated_at: i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
  Like,
  Dislike,
  View
}

impl InteractionKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      InteractionKind::Like => "like",
      InteractionKind::Dislike => "dislike",
      InteractionKind::View => "view"
    }
  }

  // Like <-> dislike for the switch semantics. Views have
  // no opposite, calling this with View is a programming
  // error on our side.
  pub fn opposite(&self) -> InteractionKind {
    match self {
      InteractionKind::Like => InteractionKind::Dislike,
      InteractionKind::Dislike => InteractionKind::Like,
      InteractionKind::View => InteractionKind::View
    }
  }
}
