use super::error::{map_db_error, Error};
use crate::db::blogs::{self, BlogFilter, BlogSearch, SortKey};
use crate::db::entities::{Blog, BlogWithAuthor};
use crate::db::queries::Order;
use crate::db::Pool;

// Validation and pagination for the two list endpoints.
// The handlers hand us raw, already-deserialized values;
// everything that can be wrong with them is rejected here
// with a message the client can act on, before any SQL
// runs.

pub const DEFAULT_LIMIT: i64 = 20;

// Raw filter parameters, before validation.
#[derive(Debug, Default)]
pub struct FilterRequest {
  pub tags: Vec<String>,
  pub date_from: Option<i64>,
  pub date_to: Option<i64>,
  pub sort_key: Option<String>,
  pub sort_order: Option<String>,
  pub limit: Option<i64>,
  pub skip: Option<i64>,
  pub page: Option<i64>
}

pub struct FilterOutcome {
  pub blogs: Vec<Blog>,
  pub total_count: i64,
  pub page: i64,
  pub limit: i64
}

#[derive(Debug, Default)]
pub struct SearchRequest {
  pub title: Option<String>,
  pub author: Option<String>,
  pub limit: Option<i64>,
  pub skip: Option<i64>,
  pub page: Option<i64>
}

pub struct SearchOutcome {
  pub blogs: Vec<BlogWithAuthor>,
  pub total_count: i64,
  pub page: i64,
  pub limit: i64,
  // The skip that was actually applied, echoed back to
  // the caller. Not always a multiple of limit, so it
  // can't be reconstructed from the page number.
  pub skip: i64
}

pub fn filter_blogs(
  pool: &Pool,
  req: &FilterRequest
) -> Result<FilterOutcome, Error> {
  if let (Some(from), Some(to)) = (req.date_from, req.date_to) {
    if from > to {
      return Err(Error::BadRequest(
        "date_from cannot be after date_to".to_string()
      ));
    }
  }
  let sort_key = match &req.sort_key {
    Some(raw) => match SortKey::parse(raw) {
      Some(key) => Some(key),
      None => {
        return Err(Error::BadRequest(
          "invalid popularity_sort value. Valid values: \
           views, likes, dislikes, engagement".to_string()
        ))
      }
    },
    None => None
  };
  let sort_order = parse_order(&req.sort_order)?;
  let (limit, skip) = pagination(req.limit, req.skip, req.page)?;

  let filter = BlogFilter {
    tags: req.tags.clone(),
    date_from: req.date_from,
    date_to: req.date_to,
    sort_key,
    sort_order,
    limit,
    skip
  };
  let (blogs, total_count) =
    blogs::filter_blogs(pool, &filter).map_err(map_db_error)?;
  Ok(FilterOutcome {
    blogs,
    total_count,
    page: page_of(skip, limit),
    limit
  })
}

pub fn search_blogs(
  pool: &Pool,
  req: &SearchRequest
) -> Result<SearchOutcome, Error> {
  let title = trimmed(&req.title);
  let author = trimmed(&req.author);
  if title.is_none() && author.is_none() {
    return Err(Error::BadRequest(
      "at least one search parameter (title or author) \
       must be provided".to_string()
    ));
  }
  let (limit, skip) = pagination(req.limit, req.skip, req.page)?;

  let search = BlogSearch { title, author, limit, skip };
  let (blogs, total_count) =
    blogs::search_blogs(pool, &search).map_err(map_db_error)?;
  Ok(SearchOutcome {
    blogs,
    total_count,
    page: page_of(skip, limit),
    limit,
    skip
  })
}

fn trimmed(value: &Option<String>) -> Option<String> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

fn parse_order(raw: &Option<String>) -> Result<Order, Error> {
  match raw.as_deref() {
    None => Ok(Order::Desc),
    Some(s) => match s.to_lowercase().as_str() {
      "asc" => Ok(Order::Asc),
      "desc" => Ok(Order::Desc),
      _ => Err(Error::BadRequest(
        "invalid sort_order value. Valid values: asc, desc".to_string()
      ))
    }
  }
}

// "page" wins over "skip" when both are sent. A limit of
// zero (or none) falls back to the default page size so a
// page number always means something.
fn pagination(
  limit: Option<i64>,
  skip: Option<i64>,
  page: Option<i64>
) -> Result<(i64, i64), Error> {
  let limit = match limit {
    Some(l) if l < 0 => {
      return Err(Error::BadRequest("limit cannot be negative".to_string()))
    }
    Some(0) | None => DEFAULT_LIMIT,
    Some(l) => l
  };
  let skip = match (page, skip) {
    (Some(p), _) => {
      if p < 1 {
        return Err(Error::BadRequest(
          "page must be a positive integer".to_string()
        ));
      }
      // The page number comes straight from the query
      // string, so the conversion must not be allowed to
      // overflow.
      match (p - 1).checked_mul(limit) {
        Some(s) => s,
        None => {
          return Err(Error::BadRequest(
            "page is out of range".to_string()
          ))
        }
      }
    }
    (None, Some(s)) if s < 0 => {
      return Err(Error::BadRequest("skip cannot be negative".to_string()))
    }
    (None, Some(s)) => s,
    (None, None) => 0
  };
  Ok((limit, skip))
}

fn page_of(skip: i64, limit: i64) -> i64 {
  if skip > 0 && limit > 0 {
    skip / limit + 1
  } else {
    1
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;
  use crate::db::entities::{User, ROLE_USER};

  fn seed_blog(
    pool: &Pool,
    user_id: i64,
    title: &str,
    tags: &[&str],
    created_at: i64
  ) -> i64 {
    let mut blog = Blog {
      id: -1,
      user_id,
      title: title.to_string(),
      content: "content".to_string(),
      tags: tags.iter().map(|t| t.to_string()).collect(),
      like_count: 0,
      dislike_count: 0,
      view_count: 0,
      created_at,
      updated_at: created_at
    };
    db::blogs::insert_blog(pool, &mut blog).unwrap();
    blog.id
  }

  fn seed_user(pool: &Pool, username: &str) -> i64 {
    let mut user = User {
      id: -1,
      username: username.to_string(),
      email: format!("{}@example.com", username),
      password_hash: "x".to_string(),
      salt: "y".to_string(),
      role: ROLE_USER.to_string(),
      bio: None,
      created_at: 0,
      updated_at: 0
    };
    db::users::insert_user(pool, &mut user).unwrap();
    user.id
  }

  #[test]
  fn rejects_inverted_date_range() {
    let pool = db::test_pool();
    let req = FilterRequest {
      date_from: Some(200),
      date_to: Some(100),
      ..Default::default()
    };
    match filter_blogs(&pool, &req) {
      Err(Error::BadRequest(msg)) => {
        assert_eq!(msg, "date_from cannot be after date_to")
      }
      other => panic!("expected BadRequest, got {:?}", other.is_ok())
    }
  }

  #[test]
  fn rejects_unknown_sort_key_and_order() {
    let pool = db::test_pool();
    let req = FilterRequest {
      sort_key: Some("comments".to_string()),
      ..Default::default()
    };
    assert!(matches!(
      filter_blogs(&pool, &req),
      Err(Error::BadRequest(_))
    ));
    let req = FilterRequest {
      sort_order: Some("sideways".to_string()),
      ..Default::default()
    };
    assert!(matches!(
      filter_blogs(&pool, &req),
      Err(Error::BadRequest(_))
    ));
  }

  #[test]
  fn rejects_negative_pagination() {
    assert!(pagination(Some(-1), None, None).is_err());
    assert!(pagination(None, Some(-1), None).is_err());
    assert!(pagination(None, None, Some(0)).is_err());
  }

  #[test]
  fn huge_page_numbers_are_rejected() {
    match pagination(Some(10), None, Some(i64::MAX)) {
      Err(Error::BadRequest(msg)) => {
        assert_eq!(msg, "page is out of range")
      }
      _ => panic!("expected BadRequest")
    }
  }

  #[test]
  fn page_translates_to_skip() {
    assert_eq!(pagination(Some(10), None, Some(3)).unwrap(), (10, 20));
    // Page beats an explicit skip.
    assert_eq!(pagination(Some(10), Some(99), Some(1)).unwrap(), (10, 0));
    // Zero or missing limit falls back to the default.
    assert_eq!(
      pagination(Some(0), None, Some(2)).unwrap(),
      (DEFAULT_LIMIT, DEFAULT_LIMIT)
    );
  }

  #[test]
  fn paginates_and_reports_totals() {
    let pool = db::test_pool();
    let user_id = seed_user(&pool, "author");
    for i in 0..25 {
      seed_blog(&pool, user_id, &format!("post {}", i), &[], 1000 + i);
    }
    let req = FilterRequest {
      limit: Some(10),
      skip: Some(10),
      ..Default::default()
    };
    let outcome = filter_blogs(&pool, &req).unwrap();
    assert_eq!(outcome.blogs.len(), 10);
    assert_eq!(outcome.total_count, 25);
    assert_eq!(outcome.page, 2);
    assert_eq!(outcome.limit, 10);
  }

  #[test]
  fn tag_filter_matches_any_listed_tag() {
    let pool = db::test_pool();
    let user_id = seed_user(&pool, "author");
    let rust = seed_blog(&pool, user_id, "a", &["rust"], 1000);
    let web = seed_blog(&pool, user_id, "b", &["web"], 1001);
    seed_blog(&pool, user_id, "c", &["cooking"], 1002);
    let req = FilterRequest {
      tags: vec!["rust".to_string(), "web".to_string()],
      ..Default::default()
    };
    let outcome = filter_blogs(&pool, &req).unwrap();
    assert_eq!(outcome.total_count, 2);
    let ids: Vec<i64> = outcome.blogs.iter().map(|b| b.id).collect();
    assert!(ids.contains(&rust) && ids.contains(&web));
  }

  #[test]
  fn date_range_is_inclusive() {
    let pool = db::test_pool();
    let user_id = seed_user(&pool, "author");
    seed_blog(&pool, user_id, "early", &[], 100);
    let inside = seed_blog(&pool, user_id, "inside", &[], 200);
    seed_blog(&pool, user_id, "late", &[], 300);
    let req = FilterRequest {
      date_from: Some(150),
      date_to: Some(250),
      ..Default::default()
    };
    let outcome = filter_blogs(&pool, &req).unwrap();
    assert_eq!(outcome.total_count, 1);
    assert_eq!(outcome.blogs[0].id, inside);
  }

  #[test]
  fn sorts_by_requested_counter() {
    let pool = db::test_pool();
    let user_id = seed_user(&pool, "author");
    let low = seed_blog(&pool, user_id, "low", &[], 1000);
    let high = seed_blog(&pool, user_id, "high", &[], 1001);
    let conn = pool.clone().get().unwrap();
    db::blogs::bump_counters(&conn, high, 5, 0, 0).unwrap();
    db::blogs::bump_counters(&conn, low, 1, 0, 0).unwrap();
    drop(conn);
    let req = FilterRequest {
      sort_key: Some("likes".to_string()),
      sort_order: Some("desc".to_string()),
      ..Default::default()
    };
    let outcome = filter_blogs(&pool, &req).unwrap();
    assert_eq!(outcome.blogs[0].id, high);
    assert_eq!(outcome.blogs[1].id, low);
  }

  #[test]
  fn search_requires_a_parameter() {
    let pool = db::test_pool();
    let req = SearchRequest {
      title: Some("   ".to_string()),
      ..Default::default()
    };
    assert!(matches!(
      search_blogs(&pool, &req),
      Err(Error::BadRequest(_))
    ));
  }

  #[test]
  fn search_matches_title_substring() {
    let pool = db::test_pool();
    let user_id = seed_user(&pool, "grace");
    seed_blog(&pool, user_id, "Learning Rust the hard way", &[], 1000);
    seed_blog(&pool, user_id, "Sourdough basics", &[], 1001);
    let req = SearchRequest {
      title: Some("rust".to_string()),
      ..Default::default()
    };
    let outcome = search_blogs(&pool, &req).unwrap();
    assert_eq!(outcome.total_count, 1);
    assert_eq!(outcome.blogs[0].blog.title, "Learning Rust the hard way");
    assert_eq!(outcome.blogs[0].author_name, "grace");
  }

  #[test]
  fn search_echoes_the_applied_skip() {
    let pool = db::test_pool();
    let user_id = seed_user(&pool, "grace");
    for i in 0..20 {
      seed_blog(&pool, user_id, &format!("post {}", i), &[], 1000 + i);
    }
    // A skip that isn't on a page boundary must come back
    // unchanged, not rounded down to one.
    let req = SearchRequest {
      title: Some("post".to_string()),
      limit: Some(10),
      skip: Some(15),
      ..Default::default()
    };
    let outcome = search_blogs(&pool, &req).unwrap();
    assert_eq!(outcome.skip, 15);
    assert_eq!(outcome.blogs.len(), 5);
    assert_eq!(outcome.total_count, 20);
  }

  #[test]
  fn search_by_author_and_orphaned_blogs() {
    let pool = db::test_pool();
    let user_id = seed_user(&pool, "grace");
    seed_blog(&pool, user_id, "Owned post", &[], 1000);
    // No matching users row for this author id.
    seed_blog(&pool, 999, "Orphan post", &[], 1001);
    let req = SearchRequest {
      author: Some("grace".to_string()),
      ..Default::default()
    };
    let outcome = search_blogs(&pool, &req).unwrap();
    assert_eq!(outcome.total_count, 1);
    assert_eq!(outcome.blogs[0].author_name, "grace");

    let req = SearchRequest {
      author: Some("Unknown".to_string()),
      ..Default::default()
    };
    let outcome = search_blogs(&pool, &req).unwrap();
    assert_eq!(outcome.total_count, 1);
    assert_eq!(outcome.blogs[0].author_name, "Unknown Author");
  }
}
