use super::ai;
use super::auth;
use super::dtos::*;
use super::error::{map_db_error, Error};
use super::filtering::{self, FilterRequest, SearchRequest};
use super::helpers;
use super::interactions;
use super::popularity::{self, ScorePolicy};
use super::AppState;
use crate::db;
use crate::db::entities::{Blog, Comment, User};
use crate::db::interactions::Viewer;
use crate::utils::{text_utils, time_utils};
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

// All the route handlers in one place, same as everything
// else we grouped per layer rather than per feature.

const MAX_COMMENT_LENGTH: usize = 2000;
const DEFAULT_POPULAR_LIMIT: i64 = 10;
// The "my blogs" endpoint always pages in small chunks.
const MAX_OWN_BLOGS_LIMIT: i64 = 5;

// ----- Auth -----

pub async fn register(
  data: web::Data<AppState>,
  form: web::Json<RegisterForm>
) -> Result<HttpResponse, Error> {
  let username = form.username.trim().to_string();
  let email = form.email.trim().to_lowercase();
  if username.is_empty() || email.is_empty() || form.password.is_empty() {
    return Err(Error::BadRequest(
      "username, email and password are required".to_string()
    ));
  }
  if db::users::user_by_email(&data.pool, &email)
    .map_err(map_db_error)?
    .is_some() {
    return Err(Error::BadRequest(
      "email is already registered".to_string()
    ));
  }
  let now = time_utils::current_timestamp();
  let salt = auth::generate_salt();
  let mut user = User {
    id: -1,
    username,
    email,
    password_hash: auth::hash_password(&form.password, &salt),
    salt,
    role: db::entities::ROLE_USER.to_string(),
    bio: None,
    created_at: now,
    updated_at: now
  };
  db::users::insert_user(&data.pool, &mut user).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(ProfileDto::from(user)))
}

pub async fn login(
  data: web::Data<AppState>,
  form: web::Json<LoginForm>
) -> Result<HttpResponse, Error> {
  let email = form.email.trim().to_lowercase();
  let user = db::users::user_by_email(&data.pool, &email)
    .map_err(map_db_error)?
    // Same message whether the email or the password is
    // wrong, we don't leak which accounts exist.
    .ok_or_else(|| Error::Unauthorized("invalid credentials".to_string()))?;
  if !auth::verify_password(&form.password, &user.salt, &user.password_hash) {
    return Err(Error::Unauthorized("invalid credentials".to_string()));
  }
  let now = time_utils::current_timestamp();
  // Logins are rare enough to double as session cleanup.
  db::users::purge_expired_sessions(&data.pool, now)
    .map_err(map_db_error)?;
  let token = auth::generate_token();
  let expires = now + data.session_ttl;
  db::users::insert_session(&data.pool, &token, user.id, expires)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(TokenDto {
    token,
    user_id: user.id,
    expires: time_utils::timestamp_to_rfc3339(expires)
  }))
}

pub async fn logout(
  req: HttpRequest,
  data: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let token = auth::require_token(&req)?;
  db::users::delete_session(&data.pool, &token).map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Logged out" })))
}

// ----- Profile -----

pub async fn profile(
  req: HttpRequest,
  data: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  Ok(HttpResponse::Ok().json(ProfileDto::from(user)))
}

pub async fn update_profile(
  req: HttpRequest,
  data: web::Data<AppState>,
  form: web::Json<ProfileUpdateForm>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let username = match &form.username {
    Some(name) => {
      let name = name.trim();
      if name.is_empty() {
        return Err(Error::BadRequest(
          "username cannot be empty".to_string()
        ));
      }
      Some(name.to_string())
    }
    None => None
  };
  db::users::update_profile(
    &data.pool,
    user.id,
    username.as_deref(),
    form.bio.as_deref(),
    time_utils::current_timestamp()
  ).map_err(map_db_error)?;
  let updated = db::users::user_by_id(&data.pool, user.id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
  Ok(HttpResponse::Ok().json(ProfileDto::from(updated)))
}

// ----- Blogs -----

pub async fn create_blog(
  req: HttpRequest,
  data: web::Data<AppState>,
  form: web::Json<BlogForm>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let title = form.title.trim();
  if title.is_empty() || form.content.trim().is_empty() {
    return Err(Error::BadRequest(
      "title and content are required".to_string()
    ));
  }
  let now = time_utils::current_timestamp();
  let mut blog = Blog {
    id: -1,
    user_id: user.id,
    title: title.to_string(),
    content: form.content.clone(),
    tags: form.tags.clone().unwrap_or_default(),
    like_count: 0,
    dislike_count: 0,
    view_count: 0,
    created_at: now,
    updated_at: now
  };
  db::blogs::insert_blog(&data.pool, &mut blog).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(BlogDto::from(blog)))
}

pub async fn my_blogs(
  req: HttpRequest,
  data: web::Data<AppState>,
  query: web::Query<MyBlogsQuery>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let page = query.page.unwrap_or(1).max(1);
  let limit = capped_limit(query.limit, MAX_OWN_BLOGS_LIMIT);
  let blogs = db::blogs::blogs_by_user(&data.pool, user.id, page, limit)
    .map_err(map_db_error)?;
  let dtos: Vec<BlogDto> = blogs.into_iter().map(BlogDto::from).collect();
  Ok(HttpResponse::Ok().json(json!({
    "blogs": dtos,
    "page": page,
    "limit": limit
  })))
}

pub async fn blog_by_id(
  data: web::Data<AppState>,
  id: web::Path<i64>
) -> Result<HttpResponse, Error> {
  let blog = fetch_blog(&data.pool, *id)?;
  Ok(HttpResponse::Ok().json(BlogDto::from(blog)))
}

pub async fn update_blog(
  req: HttpRequest,
  data: web::Data<AppState>,
  id: web::Path<i64>,
  form: web::Json<BlogUpdateForm>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let blog = fetch_blog(&data.pool, *id)?;
  check_blog_ownership(&user, &blog)?;
  if form.title.is_none() && form.content.is_none() && form.tags.is_none() {
    return Err(Error::BadRequest(
      "at least one field must be provided".to_string()
    ));
  }
  if let Some(title) = &form.title {
    if title.trim().is_empty() {
      return Err(Error::BadRequest("title cannot be empty".to_string()));
    }
  }
  db::blogs::update_blog_fields(
    &data.pool,
    blog.id,
    form.title.as_deref().map(str::trim),
    form.content.as_deref(),
    form.tags.as_deref(),
    time_utils::current_timestamp()
  ).map_err(map_db_error)?;
  let updated = fetch_blog(&data.pool, blog.id)?;
  Ok(HttpResponse::Ok().json(BlogDto::from(updated)))
}

pub async fn delete_blog(
  req: HttpRequest,
  data: web::Data<AppState>,
  id: web::Path<i64>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let blog = fetch_blog(&data.pool, *id)?;
  check_blog_ownership(&user, &blog)?;
  db::blogs::delete_blog(&data.pool, blog.id).map_err(map_db_error)?;
  Ok(HttpResponse::NoContent().finish())
}

// ----- Interactions -----

pub async fn like_blog(
  req: HttpRequest,
  data: web::Data<AppState>,
  id: web::Path<i64>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let blog = fetch_blog(&data.pool, *id)?;
  interactions::like_blog(&data.pool, blog.id, user.id)?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Blog liked successfully"
  })))
}

pub async fn dislike_blog(
  req: HttpRequest,
  data: web::Data<AppState>,
  id: web::Path<i64>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let blog = fetch_blog(&data.pool, *id)?;
  interactions::dislike_blog(&data.pool, blog.id, user.id)?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Blog disliked successfully"
  })))
}

// Views don't require a login. Anonymous viewers get
// identified by ip address + user agent, which is also
// what the debounce window keys on.
pub async fn view_blog(
  req: HttpRequest,
  data: web::Data<AppState>,
  id: web::Path<i64>
) -> Result<HttpResponse, Error> {
  let blog = fetch_blog(&data.pool, *id)?;
  let viewer = match auth::authenticated_user(&req, &data.pool)? {
    Some(user) => Viewer::User(user.id),
    None => Viewer::Anonymous {
      ip_address: helpers::real_ip_addr(&req)
        .map(|ip| ip.to_string())
        .unwrap_or_default(),
      user_agent: helpers::user_agent(&req)
    }
  };
  interactions::view_blog(
    &data.pool,
    blog.id,
    viewer,
    time_utils::current_timestamp()
  )?;
  // Debounced views still answer 200, the client doesn't
  // care either way.
  Ok(HttpResponse::Ok().json(json!({
    "message": "Blog view recorded"
  })))
}

// ----- Discovery -----

pub async fn popular_blogs(
  data: web::Data<AppState>,
  query: web::Query<PopularQuery>
) -> Result<HttpResponse, Error> {
  let limit = match query.limit {
    Some(l) if l > 0 => l,
    _ => DEFAULT_POPULAR_LIMIT
  };
  let ranked = popularity::popular_blogs(
    &data.pool,
    limit,
    &ScorePolicy::default(),
    time_utils::current_timestamp()
  )?;
  let dtos: Vec<PopularBlogDto> = ranked
    .into_iter()
    .map(|scored| PopularBlogDto {
      blog: BlogDto::from(scored.blog),
      comment_count: scored.comment_count,
      popularity_score: scored.score
    })
    .collect();
  Ok(HttpResponse::Ok().json(json!({
    "message": "Popular blogs retrieved successfully",
    "count": dtos.len(),
    "data": dtos
  })))
}

pub async fn filter_blogs(
  data: web::Data<AppState>,
  query: web::Query<FilterQuery>
) -> Result<HttpResponse, Error> {
  let date_from = parse_query_date(&query.date_from, "date_from")?;
  let date_to = parse_query_date(&query.date_to, "date_to")?;
  let request = FilterRequest {
    tags: parse_tag_list(&query.tags),
    date_from,
    date_to,
    sort_key: query.popularity_sort.clone(),
    sort_order: query.sort_order.clone(),
    limit: query.limit,
    skip: query.skip,
    page: query.page
  };
  let outcome = filtering::filter_blogs(&data.pool, &request)?;
  let dtos: Vec<BlogDto> =
    outcome.blogs.into_iter().map(BlogDto::from).collect();
  Ok(HttpResponse::Ok().json(json!({
    "message": "Blogs filtered successfully",
    "data": FilterResponseDto {
      count: dtos.len(),
      blogs: dtos,
      total_count: outcome.total_count,
      page: outcome.page,
      limit: outcome.limit
    }
  })))
}

pub async fn search_blogs(
  data: web::Data<AppState>,
  query: web::Query<SearchQuery>
) -> Result<HttpResponse, Error> {
  let request = SearchRequest {
    title: query.title.clone(),
    author: query.author.clone(),
    limit: query.limit,
    skip: query.skip,
    page: query.page
  };
  let outcome = filtering::search_blogs(&data.pool, &request)?;
  let dtos: Vec<BlogWithAuthorDto> = outcome
    .blogs
    .into_iter()
    .map(BlogWithAuthorDto::from)
    .collect();
  Ok(HttpResponse::Ok().json(json!({
    "message": "Blog search completed successfully",
    "data": SearchResponseDto {
      count: dtos.len(),
      blogs: dtos,
      total_count: outcome.total_count,
      query: SearchQueryDto {
        title: request.title,
        author: request.author,
        limit: outcome.limit,
        skip: outcome.skip
      }
    }
  })))
}

// ----- Comments -----

pub async fn create_comment(
  req: HttpRequest,
  data: web::Data<AppState>,
  id: web::Path<i64>,
  form: web::Json<CommentForm>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let blog = fetch_blog(&data.pool, *id)?;
  let content = validated_comment_content(&form.content)?;
  let now = time_utils::current_timestamp();
  let mut comment = Comment {
    id: -1,
    blog_id: blog.id,
    user_id: user.id,
    content,
    created_at: now,
    updated_at: now
  };
  db::comments::insert_comment(&data.pool, &mut comment)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(CommentDto::from(comment)))
}

pub async fn blog_comments(
  data: web::Data<AppState>,
  id: web::Path<i64>
) -> Result<HttpResponse, Error> {
  let blog = fetch_blog(&data.pool, *id)?;
  let comments = db::comments::comments_by_blog(&data.pool, blog.id)
    .map_err(map_db_error)?;
  let dtos: Vec<CommentDto> =
    comments.into_iter().map(CommentDto::from).collect();
  Ok(HttpResponse::Ok().json(dtos))
}

pub async fn comment_by_id(
  data: web::Data<AppState>,
  id: web::Path<i64>
) -> Result<HttpResponse, Error> {
  let comment = fetch_comment(&data.pool, *id)?;
  Ok(HttpResponse::Ok().json(CommentDto::from(comment)))
}

pub async fn update_comment(
  req: HttpRequest,
  data: web::Data<AppState>,
  id: web::Path<i64>,
  form: web::Json<CommentForm>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let comment = fetch_comment(&data.pool, *id)?;
  if comment.user_id != user.id {
    return Err(Error::Forbidden(
      "You can only edit your own comments".to_string()
    ));
  }
  let content = validated_comment_content(&form.content)?;
  db::comments::update_comment(
    &data.pool,
    comment.id,
    &content,
    time_utils::current_timestamp()
  ).map_err(map_db_error)?;
  let updated = fetch_comment(&data.pool, comment.id)?;
  Ok(HttpResponse::Ok().json(CommentDto::from(updated)))
}

pub async fn delete_comment(
  req: HttpRequest,
  data: web::Data<AppState>,
  id: web::Path<i64>
) -> Result<HttpResponse, Error> {
  let user = auth::require_user(&req, &data.pool)?;
  let comment = fetch_comment(&data.pool, *id)?;
  if comment.user_id != user.id && !user.is_admin() {
    return Err(Error::Forbidden(
      "You can only delete your own comments".to_string()
    ));
  }
  db::comments::delete_comment(&data.pool, comment.id)
    .map_err(map_db_error)?;
  Ok(HttpResponse::NoContent().finish())
}

// ----- AI -----

pub async fn generate_blog(
  req: HttpRequest,
  data: web::Data<AppState>,
  form: web::Json<AiPromptForm>
) -> Result<HttpResponse, Error> {
  auth::require_user(&req, &data.pool)?;
  let generated = ai::generate_blog(&data.ai, &form.prompt).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Blog content generated successfully",
    "data": generated
  })))
}

// ----- Fallback -----

pub async fn not_found() -> Result<HttpResponse, Error> {
  Err(Error::NotFound("Resource not found".to_string()))
}

// ----- Shared helpers -----

fn fetch_blog(pool: &db::Pool, id: i64) -> Result<Blog, Error> {
  db::blogs::blog_by_id(pool, id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound("Blog not found".to_string()))
}

fn fetch_comment(pool: &db::Pool, id: i64) -> Result<Comment, Error> {
  db::comments::comment_by_id(pool, id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound("Comment not found".to_string()))
}

fn check_blog_ownership(user: &User, blog: &Blog) -> Result<(), Error> {
  if blog.user_id != user.id && !user.is_admin() {
    return Err(Error::Forbidden(
      "You do not own this blog".to_string()
    ));
  }
  Ok(())
}

fn validated_comment_content(raw: &str) -> Result<String, Error> {
  let content = raw.trim();
  if content.is_empty() {
    return Err(Error::BadRequest(
      "comment content cannot be empty".to_string()
    ));
  }
  if content.chars().count() > MAX_COMMENT_LENGTH {
    return Err(Error::BadRequest(format!(
      "comment content cannot exceed {} characters",
      MAX_COMMENT_LENGTH
    )));
  }
  // Comments get rendered by whatever frontend sits in
  // front of us, so markup gets neutralized on the way in.
  Ok(text_utils::escape_html(content))
}

fn capped_limit(requested: Option<i64>, max: i64) -> i64 {
  match requested {
    Some(l) if l >= 1 && l <= max => l,
    _ => max
  }
}

// Tags arrive as one comma separated query parameter.
fn parse_tag_list(raw: &Option<String>) -> Vec<String> {
  raw
    .as_deref()
    .unwrap_or("")
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_string)
    .collect()
}

fn parse_query_date(
  raw: &Option<String>,
  field: &str
) -> Result<Option<i64>, Error> {
  match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    None => Ok(None),
    Some(s) => match time_utils::parse_compact_date(s) {
      Some(ts) => Ok(Some(ts)),
      None => Err(Error::BadRequest(format!(
        "Invalid {} format. Use YYYY-MM-DD",
        field
      )))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tag_list_splits_and_trims() {
    assert_eq!(
      parse_tag_list(&Some("rust, web ,,cooking".to_string())),
      vec!["rust", "web", "cooking"]
    );
    assert!(parse_tag_list(&None).is_empty());
    assert!(parse_tag_list(&Some("  ,  ".to_string())).is_empty());
  }

  #[test]
  fn own_blogs_limit_is_capped() {
    assert_eq!(capped_limit(None, 5), 5);
    assert_eq!(capped_limit(Some(3), 5), 3);
    assert_eq!(capped_limit(Some(50), 5), 5);
    assert_eq!(capped_limit(Some(0), 5), 5);
  }

  #[test]
  fn comment_content_is_validated() {
    assert!(validated_comment_content("  ").is_err());
    assert_eq!(validated_comment_content(" hi ").unwrap(), "hi");
    assert_eq!(
      validated_comment_content("<b>bold</b>").unwrap(),
      "&lt;b&gt;bold&lt;/b&gt;"
    );
    let long = "x".repeat(MAX_COMMENT_LENGTH + 1);
    assert!(validated_comment_content(&long).is_err());
  }

  #[test]
  fn query_dates_parse_or_reject() {
    assert_eq!(parse_query_date(&None, "date_from").unwrap(), None);
    assert_eq!(
      parse_query_date(&Some("2024-01-01".to_string()), "date_from")
        .unwrap(),
      Some(1704067200)
    );
    match parse_query_date(&Some("01/02/2024".to_string()), "date_to") {
      Err(Error::BadRequest(msg)) => {
        assert_eq!(msg, "Invalid date_to format. Use YYYY-MM-DD")
      }
      _ => panic!("expected BadRequest")
    }
  }
}
