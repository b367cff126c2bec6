// Small query building helpers for the handful of places
// where the WHERE clause depends on which filters the
// caller actually provided.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
  Asc,
  Desc
}

impl Order {
  pub fn as_sql(&self) -> &'static str {
    match self {
      Order::Asc => "ASC",
      Order::Desc => "DESC"
    }
  }
}

pub struct OrderBy {
  pub order: Order,
  pub field: String
}

impl OrderBy {
  pub fn new(order: Order, field: String) -> Self {
    OrderBy {
      order,
      field
    }
  }
}

// All the WHERE parts are glued with AND, which is the
// only thing the filter and search queries ever need.
// Decided against a full blown builder struct, a function
// with options does the trick.
pub fn select_query_builder(
  q_fields: &[&str],
  q_from: &str,
  q_where: &[String],
  q_order: Option<OrderBy>,
  limit: Option<i64>,
  offset: Option<i64>
) -> String {
  let mut query = format!(
    "SELECT {} FROM {} ",
    q_fields.join(","),
    q_from
  );
  if !q_where.is_empty() {
    query.push_str(
      &format!(
        "WHERE {} ",
        q_where.join(" AND ")
      )
    );
  }
  if let Some(order) = q_order {
    query.push_str(
      &format!("ORDER BY {} {} ", order.field, order.order.as_sql())
    );
  }
  if let Some(lim) = limit {
    query.push_str(&format!("LIMIT {} ", lim));
    if let Some(off) = offset {
      query.push_str(&format!("OFFSET {} ", off));
    }
  }
  query
}

// Generates "(?,?,?)" style placeholder lists for IN
// clauses, since we can't bind a whole Vec as one param.
pub fn generate_in_placeholders(count: usize) -> String {
  let marks: Vec<&str> = std::iter::repeat("?").take(count).collect();
  format!("({})", marks.join(","))
}
