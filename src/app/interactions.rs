use super::error::{map_db_error, Error};
use crate::db::entities::InteractionKind;
use crate::db::interactions::{self, Viewer};
use crate::db::{blogs, Pool};
use crate::utils::time_utils;

// The interaction engine. Keeps the aggregate counters on
// the blog row and the per-user interaction log consistent
// under the toggle/switch semantics:
// - same action again reverts it (toggle off),
// - the opposite action replaces it (switch).
// Each operation is one SQLite transaction, so a failed
// counter bump rolls the log write back with it instead of
// leaving the two out of sync.

// Rolling window during which repeated views by the same
// identity don't count.
pub const VIEW_DEBOUNCE_SECS: i64 = 24 * 60 * 60;

// Tells the handler whether a view actually counted.
// Both cases are a 200 for the client.
#[derive(Debug, PartialEq, Eq)]
pub enum ViewOutcome {
  Recorded,
  Debounced
}

pub fn like_blog(pool: &Pool, blog_id: i64, user_id: i64) -> Result<(), Error> {
  toggle_interaction(pool, blog_id, user_id, InteractionKind::Like)
}

pub fn dislike_blog(pool: &Pool, blog_id: i64, user_id: i64) -> Result<(), Error> {
  toggle_interaction(pool, blog_id, user_id, InteractionKind::Dislike)
}

// Like and dislike are perfectly symmetric, so both run
// through here with the roles swapped.
fn toggle_interaction(
  pool: &Pool,
  blog_id: i64,
  user_id: i64,
  kind: InteractionKind
) -> Result<(), Error> {
  let opposite = kind.opposite();
  let mut conn = pool.clone().get().map_err(map_db_error)?;
  let tx = conn.transaction().map_err(map_db_error)?;

  let has_same = interactions::has_interaction(&tx, blog_id, user_id, kind)
    .map_err(map_db_error)?;
  let has_opposite =
    interactions::has_interaction(&tx, blog_id, user_id, opposite)
      .map_err(map_db_error)?;

  if has_same {
    // Toggle off:
    interactions::remove_interaction(&tx, blog_id, user_id, kind)
      .map_err(map_db_error)?;
    let (like_delta, dislike_delta) = counter_deltas(kind, -1, 0);
    blogs::bump_counters(&tx, blog_id, like_delta, dislike_delta, 0)
      .map_err(map_db_error)?;
  } else if has_opposite {
    // Switch:
    interactions::remove_interaction(&tx, blog_id, user_id, opposite)
      .map_err(map_db_error)?;
    interactions::add_interaction(
      &tx,
      blog_id,
      Some(user_id),
      None,
      None,
      kind,
      None,
      time_utils::current_timestamp()
    ).map_err(map_db_error)?;
    let (like_delta, dislike_delta) = counter_deltas(kind, 1, -1);
    blogs::bump_counters(&tx, blog_id, like_delta, dislike_delta, 0)
      .map_err(map_db_error)?;
  } else {
    // First interaction of this user with this blog:
    interactions::add_interaction(
      &tx,
      blog_id,
      Some(user_id),
      None,
      None,
      kind,
      None,
      time_utils::current_timestamp()
    ).map_err(map_db_error)?;
    let (like_delta, dislike_delta) = counter_deltas(kind, 1, 0);
    blogs::bump_counters(&tx, blog_id, like_delta, dislike_delta, 0)
      .map_err(map_db_error)?;
  }

  tx.commit().map_err(map_db_error)
}

// Translates "delta for the acted kind / delta for the
// opposite kind" into (like_delta, dislike_delta).
fn counter_deltas(
  kind: InteractionKind,
  same_delta: i64,
  opposite_delta: i64
) -> (i64, i64) {
  match kind {
    InteractionKind::Like => (same_delta, opposite_delta),
    InteractionKind::Dislike => (opposite_delta, same_delta),
    // Views never go through the toggle path.
    InteractionKind::View => (0, 0)
  }
}

// Views are deduplicated behaviorally instead of
// structurally: an unexpired view row for the same
// identity turns the call into a no-op. "now" comes from
// the caller so the window is testable.
pub fn view_blog(
  pool: &Pool,
  blog_id: i64,
  viewer: Viewer,
  now: i64
) -> Result<ViewOutcome, Error> {
  let mut conn = pool.clone().get().map_err(map_db_error)?;
  let tx = conn.transaction().map_err(map_db_error)?;

  if interactions::has_recent_view(&tx, blog_id, &viewer, now)
    .map_err(map_db_error)? {
    // Already viewed recently, don't record or count.
    return Ok(ViewOutcome::Debounced);
  }

  let (user_id, ip_address, user_agent) = match &viewer {
    Viewer::User(id) => (Some(*id), None, None),
    Viewer::Anonymous { ip_address, user_agent } => {
      (None, Some(ip_address.as_str()), Some(user_agent.as_str()))
    }
  };
  interactions::add_interaction(
    &tx,
    blog_id,
    user_id,
    ip_address,
    user_agent,
    InteractionKind::View,
    Some(now + VIEW_DEBOUNCE_SECS),
    now
  ).map_err(map_db_error)?;
  blogs::bump_counters(&tx, blog_id, 0, 0, 1).map_err(map_db_error)?;

  tx.commit().map_err(map_db_error)?;
  Ok(ViewOutcome::Recorded)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;
  use crate::db::entities::Blog;

  fn seed_blog(pool: &Pool) -> i64 {
    let mut blog = Blog {
      id: -1,
      user_id: 1,
      title: "Test blog".to_string(),
      content: "Some content".to_string(),
      tags: Vec::new(),
      like_count: 0,
      dislike_count: 0,
      view_count: 0,
      created_at: 1704067200,
      updated_at: 1704067200
    };
    db::blogs::insert_blog(pool, &mut blog).unwrap();
    blog.id
  }

  fn counters(pool: &Pool, blog_id: i64) -> (i64, i64, i64) {
    let blog = db::blogs::blog_by_id(pool, blog_id).unwrap().unwrap();
    (blog.like_count, blog.dislike_count, blog.view_count)
  }

  fn row_count(pool: &Pool, blog_id: i64, kind: InteractionKind) -> i64 {
    let conn = pool.clone().get().unwrap();
    db::interactions::count_interactions(&conn, blog_id, kind).unwrap()
  }

  #[test]
  fn first_like_records_and_counts() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    like_blog(&pool, blog_id, 42).unwrap();
    assert_eq!(counters(&pool, blog_id), (1, 0, 0));
    assert_eq!(row_count(&pool, blog_id, InteractionKind::Like), 1);
  }

  #[test]
  fn like_twice_toggles_off() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    like_blog(&pool, blog_id, 42).unwrap();
    like_blog(&pool, blog_id, 42).unwrap();
    assert_eq!(counters(&pool, blog_id), (0, 0, 0));
    assert_eq!(row_count(&pool, blog_id, InteractionKind::Like), 0);
  }

  #[test]
  fn like_then_dislike_switches() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    like_blog(&pool, blog_id, 42).unwrap();
    dislike_blog(&pool, blog_id, 42).unwrap();
    assert_eq!(counters(&pool, blog_id), (0, 1, 0));
    assert_eq!(row_count(&pool, blog_id, InteractionKind::Like), 0);
    assert_eq!(row_count(&pool, blog_id, InteractionKind::Dislike), 1);
  }

  #[test]
  fn dislike_then_like_switches() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    dislike_blog(&pool, blog_id, 42).unwrap();
    like_blog(&pool, blog_id, 42).unwrap();
    assert_eq!(counters(&pool, blog_id), (1, 0, 0));
    assert_eq!(row_count(&pool, blog_id, InteractionKind::Dislike), 0);
  }

  #[test]
  fn two_users_like_independently() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    like_blog(&pool, blog_id, 1).unwrap();
    like_blog(&pool, blog_id, 2).unwrap();
    assert_eq!(counters(&pool, blog_id), (2, 0, 0));
  }

  #[test]
  fn like_missing_blog_is_a_noop_on_counters() {
    // Same as the old backend: the counter update just
    // matches zero rows when the blog doesn't exist.
    let pool = db::test_pool();
    assert!(like_blog(&pool, 999, 42).is_ok());
  }

  #[test]
  fn user_view_debounced_within_window() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    let now = 1704067200;
    assert_eq!(
      view_blog(&pool, blog_id, Viewer::User(42), now).unwrap(),
      ViewOutcome::Recorded
    );
    assert_eq!(
      view_blog(&pool, blog_id, Viewer::User(42), now + 3600).unwrap(),
      ViewOutcome::Debounced
    );
    assert_eq!(counters(&pool, blog_id), (0, 0, 1));
  }

  #[test]
  fn user_view_counts_again_after_window() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    let now = 1704067200;
    view_blog(&pool, blog_id, Viewer::User(42), now).unwrap();
    let later = now + VIEW_DEBOUNCE_SECS + 3600;
    assert_eq!(
      view_blog(&pool, blog_id, Viewer::User(42), later).unwrap(),
      ViewOutcome::Recorded
    );
    assert_eq!(counters(&pool, blog_id), (0, 0, 2));
  }

  #[test]
  fn anonymous_view_debounced_by_fingerprint() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    let now = 1704067200;
    let viewer = Viewer::Anonymous {
      ip_address: "203.0.113.7".to_string(),
      user_agent: "Mozilla/5.0".to_string()
    };
    view_blog(&pool, blog_id, viewer.clone(), now).unwrap();
    assert_eq!(
      view_blog(&pool, blog_id, viewer, now + 60).unwrap(),
      ViewOutcome::Debounced
    );
    assert_eq!(counters(&pool, blog_id), (0, 0, 1));
  }

  #[test]
  fn different_fingerprints_count_separately() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    let now = 1704067200;
    view_blog(&pool, blog_id, Viewer::Anonymous {
      ip_address: "203.0.113.7".to_string(),
      user_agent: "Mozilla/5.0".to_string()
    }, now).unwrap();
    view_blog(&pool, blog_id, Viewer::Anonymous {
      ip_address: "203.0.113.8".to_string(),
      user_agent: "Mozilla/5.0".to_string()
    }, now).unwrap();
    assert_eq!(counters(&pool, blog_id), (0, 0, 2));
  }

  #[test]
  fn user_and_anonymous_views_are_distinct_identities() {
    let pool = db::test_pool();
    let blog_id = seed_blog(&pool);
    let now = 1704067200;
    view_blog(&pool, blog_id, Viewer::User(42), now).unwrap();
    view_blog(&pool, blog_id, Viewer::Anonymous {
      ip_address: "203.0.113.7".to_string(),
      user_agent: "Mozilla/5.0".to_string()
    }, now).unwrap();
    assert_eq!(counters(&pool, blog_id), (0, 0, 2));
  }
}
