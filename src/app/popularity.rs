use super::error::{map_db_error, Error};
use crate::db::entities::Blog;
use crate::db::{blogs, comments, Pool};
use std::cmp::Ordering;

// Popularity scoring. The weights live in a policy struct
// instead of being hardcoded in the ranking loop so they
// can be tuned (or replaced in tests) without touching the
// query code.

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

pub struct ScorePolicy {
  pub like_weight: f64,
  pub comment_weight: f64,
  pub view_weight: f64,
  pub dislike_weight: f64,
  // (max age in days, boost) pairs, checked in order.
  pub recency_boosts: Vec<(i64, f64)>
}

impl Default for ScorePolicy {
  fn default() -> Self {
    ScorePolicy {
      like_weight: 3.0,
      comment_weight: 5.0,
      view_weight: 0.1,
      dislike_weight: -2.0,
      recency_boosts: vec![(1, 50.0), (7, 20.0), (30, 5.0)]
    }
  }
}

impl ScorePolicy {
  // Weighted engagement plus a boost for fresh posts.
  // Clock skew can make created_at land in the future,
  // which we just treat as age zero.
  pub fn score(&self, blog: &Blog, comment_count: i64, now: i64) -> f64 {
    let base = blog.like_count as f64 * self.like_weight
      + comment_count as f64 * self.comment_weight
      + blog.view_count as f64 * self.view_weight
      + blog.dislike_count as f64 * self.dislike_weight;
    let age_days = (now - blog.created_at).max(0) / SECONDS_PER_DAY;
    let boost = self
      .recency_boosts
      .iter()
      .find(|(max_days, _)| age_days <= *max_days)
      .map(|(_, boost)| *boost)
      .unwrap_or(0.0);
    base + boost
  }
}

pub struct ScoredBlog {
  pub blog: Blog,
  pub comment_count: i64,
  pub score: f64
}

// Scores every blog and keeps the top "limit" ones. The
// sort is stable, so equal scores keep their id order.
pub fn popular_blogs(
  pool: &Pool,
  limit: i64,
  policy: &ScorePolicy,
  now: i64
) -> Result<Vec<ScoredBlog>, Error> {
  let all = blogs::all_blogs(pool).map_err(map_db_error)?;
  let mut scored: Vec<ScoredBlog> = Vec::with_capacity(all.len());
  for blog in all {
    let comment_count =
      comments::comment_count(pool, blog.id).map_err(map_db_error)?;
    let score = policy.score(&blog, comment_count, now);
    scored.push(ScoredBlog { blog, comment_count, score });
  }
  scored.sort_by(|a, b| {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
  });
  if limit > 0 && scored.len() > limit as usize {
    scored.truncate(limit as usize);
  }
  Ok(scored)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;
  use crate::db::entities::Comment;

  fn blog_aged(days: i64, now: i64) -> Blog {
    Blog {
      id: 1,
      user_id: 1,
      title: "t".to_string(),
      content: "c".to_string(),
      tags: Vec::new(),
      like_count: 0,
      dislike_count: 0,
      view_count: 0,
      created_at: now - days * SECONDS_PER_DAY,
      updated_at: now - days * SECONDS_PER_DAY
    }
  }

  #[test]
  fn score_weights_each_counter() {
    let now = 1704067200;
    let mut blog = blog_aged(60, now);
    blog.like_count = 4;
    blog.dislike_count = 3;
    blog.view_count = 100;
    // 4*3 + 2*5 + 100*0.1 + 3*(-2) = 26, no boost at 60 days.
    let score = ScorePolicy::default().score(&blog, 2, now);
    assert!((score - 26.0).abs() < 1e-9);
  }

  #[test]
  fn recency_boost_tiers() {
    let now = 1704067200;
    let policy = ScorePolicy::default();
    assert_eq!(policy.score(&blog_aged(0, now), 0, now), 50.0);
    assert_eq!(policy.score(&blog_aged(3, now), 0, now), 20.0);
    assert_eq!(policy.score(&blog_aged(20, now), 0, now), 5.0);
    assert_eq!(policy.score(&blog_aged(90, now), 0, now), 0.0);
  }

  #[test]
  fn future_created_at_counts_as_fresh() {
    let now = 1704067200;
    let blog = blog_aged(-2, now);
    assert_eq!(ScorePolicy::default().score(&blog, 0, now), 50.0);
  }

  fn seed_blog(pool: &db::Pool, likes: i64, created_at: i64) -> i64 {
    let mut blog = Blog {
      id: -1,
      user_id: 1,
      title: "t".to_string(),
      content: "c".to_string(),
      tags: Vec::new(),
      like_count: 0,
      dislike_count: 0,
      view_count: 0,
      created_at,
      updated_at: created_at
    };
    db::blogs::insert_blog(pool, &mut blog).unwrap();
    if likes != 0 {
      let conn = pool.clone().get().unwrap();
      db::blogs::bump_counters(&conn, blog.id, likes, 0, 0).unwrap();
    }
    blog.id
  }

  #[test]
  fn ranks_by_score_and_applies_limit() {
    let pool = db::test_pool();
    let now = 1704067200;
    let old = now - 100 * SECONDS_PER_DAY;
    let low = seed_blog(&pool, 1, old);
    let high = seed_blog(&pool, 10, old);
    let mid = seed_blog(&pool, 5, old);
    let ranked =
      popular_blogs(&pool, 2, &ScorePolicy::default(), now).unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].blog.id, high);
    assert_eq!(ranked[1].blog.id, mid);
    assert!(ranked.iter().all(|s| s.blog.id != low));
  }

  #[test]
  fn comments_feed_into_the_score() {
    let pool = db::test_pool();
    let now = 1704067200;
    let old = now - 100 * SECONDS_PER_DAY;
    let quiet = seed_blog(&pool, 2, old);
    let discussed = seed_blog(&pool, 0, old);
    let mut comment = Comment {
      id: -1,
      blog_id: discussed,
      user_id: 1,
      content: "nice".to_string(),
      created_at: old,
      updated_at: old
    };
    db::comments::insert_comment(&pool, &mut comment).unwrap();
    comment.id = -1;
    db::comments::insert_comment(&pool, &mut comment).unwrap();
    let ranked =
      popular_blogs(&pool, 0, &ScorePolicy::default(), now).unwrap();
    // 2 comments (10.0) beat 2 likes (6.0).
    assert_eq!(ranked[0].blog.id, discussed);
    assert_eq!(ranked[0].comment_count, 2);
    assert_eq!(ranked[1].blog.id, quiet);
  }

  #[test]
  fn equal_scores_keep_insertion_order() {
    let pool = db::test_pool();
    let now = 1704067200;
    let old = now - 100 * SECONDS_PER_DAY;
    let first = seed_blog(&pool, 3, old);
    let second = seed_blog(&pool, 3, old);
    let ranked =
      popular_blogs(&pool, 0, &ScorePolicy::default(), now).unwrap();
    assert_eq!(ranked[0].blog.id, first);
    assert_eq!(ranked[1].blog.id, second);
  }
}
