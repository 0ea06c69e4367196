//! # Query Builder
//!
//! Assembles `SELECT` statements from clause lists and resolves named
//! parameters into SQLite positional markers.
//!
//! ## Named Parameters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Clause text uses $identifier placeholders ([A-Za-z0-9_]+):             │
//! │                                                                         │
//! │    .and_where("o.customer_id = $customerId")                           │
//! │    .and_where("o.status = $status")                                    │
//! │    .bind("status", "paid")                                             │
//! │    .bind("customerId", 42)                                             │
//! │                                                                         │
//! │  build() scans the finished text left to right:                        │
//! │                                                                         │
//! │    ... WHERE (o.customer_id = ?1) AND (o.status = ?2)                  │
//! │    args = [42, "paid"]           ← first-appearance order              │
//! │                                                                         │
//! │  A name used twice maps to the same marker and appears once in args.   │
//! │  A bound name that never appears is ignored.                           │
//! │  An unbound name stays as `$name` and is listed in `unresolved`;       │
//! │  build_strict() turns that into QueryError::UnboundParameter.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every value reaches the store as a bound argument. List filters go through
//! [`SelectQuery::where_in`], which binds each member under its own name.
//!
//! The builder does not validate SQL. A malformed fragment fails when the
//! store executes it.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::QueryError;

// =============================================================================
// Bound Values
// =============================================================================

/// A value bound to a named parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

// =============================================================================
// Clause Types
// =============================================================================

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Ascending when `asc` is set, otherwise descending.
    pub fn from_asc(asc: bool) -> Self {
        if asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Join {
    kind: JoinKind,
    table: String,
    condition: String,
}

// =============================================================================
// Select Query
// =============================================================================

/// A `SELECT` statement under construction.
///
/// Every configuration step consumes the builder and hands it back, so a
/// query is a plain value owned by whoever is assembling it:
///
/// ```rust
/// use netshop_core::query::{SelectQuery, SortDirection};
///
/// let built = SelectQuery::new("orders o")
///     .select(["o.id", "o.status"])
///     .and_where("o.customer_id = $customerId")
///     .order_by("o.id", SortDirection::Desc)
///     .bind("customerId", 42_i64)
///     .build();
///
/// assert_eq!(
///     built.sql,
///     "SELECT o.id, o.status FROM orders o WHERE o.customer_id = ?1 ORDER BY o.id DESC"
/// );
/// assert_eq!(built.args.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    columns: Vec<String>,
    from: String,
    joins: Vec<Join>,
    wheres: Vec<String>,
    group_by: Vec<String>,
    order_by: Vec<(String, SortDirection)>,
    limit: Option<i64>,
    offset: Option<i64>,
    params: HashMap<String, SqlValue>,
}

/// Output of [`SelectQuery::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    /// Query text with `?N` markers.
    pub sql: String,
    /// Arguments for `?1..?N`, in marker order.
    pub args: Vec<SqlValue>,
    /// Placeholder names present in the text but never bound.
    pub unresolved: Vec<String>,
}

impl SelectQuery {
    /// Starts a query over `table` (may include an alias, e.g. `"products p"`).
    pub fn new(table: impl Into<String>) -> Self {
        SelectQuery {
            from: table.into(),
            ..SelectQuery::default()
        }
    }

    /// Replaces the select list. An empty list renders as `SELECT *`.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a join. Joins render in the order they were added.
    pub fn join(mut self, kind: JoinKind, table: impl Into<String>, condition: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind,
            table: table.into(),
            condition: condition.into(),
        });
        self
    }

    pub fn inner_join(self, table: impl Into<String>, condition: impl Into<String>) -> Self {
        self.join(JoinKind::Inner, table, condition)
    }

    pub fn left_join(self, table: impl Into<String>, condition: impl Into<String>) -> Self {
        self.join(JoinKind::Left, table, condition)
    }

    /// Adds a WHERE fragment. Fragments are ANDed together.
    pub fn and_where(mut self, clause: impl Into<String>) -> Self {
        self.wheres.push(clause.into());
        self
    }

    /// Adds `column IN ($prefix_0, $prefix_1, ...)` and binds each value.
    ///
    /// An empty list adds nothing, so the filter is simply absent.
    pub fn where_in<I, V>(mut self, column: &str, prefix: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let mut placeholders = Vec::new();
        for (i, value) in values.into_iter().enumerate() {
            let name = format!("{prefix}_{i}");
            placeholders.push(format!("${name}"));
            self.params.insert(name, value.into());
        }

        if placeholders.is_empty() {
            return self;
        }

        self.and_where(format!("{column} IN ({})", placeholders.join(", ")))
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// Appends an ORDER BY term.
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    /// Limits the row count, bound as `$limit`.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self.params.insert("limit".to_string(), SqlValue::Integer(limit));
        self
    }

    /// Skips rows, bound as `$offset`.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self.params.insert("offset".to_string(), SqlValue::Integer(offset));
        self
    }

    /// Binds a named parameter. Rebinding a name replaces the value.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Copies every binding of `other` into this query.
    ///
    /// Used together with [`render`](Self::render) to embed one query inside
    /// another; the nested text keeps its `$names`, so both queries share
    /// markers for names they have in common.
    pub fn with_parameters_from(mut self, other: &SelectQuery) -> Self {
        for (name, value) in &other.params {
            self.params.insert(name.clone(), value.clone());
        }
        self
    }

    /// Assembles the query text with named placeholders left in place.
    pub fn render(&self) -> String {
        let mut sql = String::from("SELECT ");

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.from);

        for join in &self.joins {
            let _ = write!(sql, " {} {} ON {}", join.kind.keyword(), join.table, join.condition);
        }

        match self.wheres.as_slice() {
            [] => {}
            [only] => {
                sql.push_str(" WHERE ");
                sql.push_str(only);
            }
            many => {
                let conjoined: Vec<String> = many.iter().map(|c| format!("({c})")).collect();
                sql.push_str(" WHERE ");
                sql.push_str(&conjoined.join(" AND "));
            }
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, dir)| format!("{column} {}", dir.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(_), Some(_)) => sql.push_str(" LIMIT $limit OFFSET $offset"),
            (Some(_), None) => sql.push_str(" LIMIT $limit"),
            // SQLite needs a LIMIT before OFFSET; -1 means no limit.
            (None, Some(_)) => sql.push_str(" LIMIT -1 OFFSET $offset"),
            (None, None) => {}
        }

        sql
    }

    /// Builds the final query text and its positional arguments.
    ///
    /// Never fails. Unbound placeholders are reported in
    /// [`BuiltQuery::unresolved`] and left in the text untouched.
    pub fn build(&self) -> BuiltQuery {
        resolve_parameters(&self.render(), &self.params)
    }

    /// Like [`build`](Self::build), but refuses queries with unbound names.
    pub fn build_strict(&self) -> Result<BuiltQuery, QueryError> {
        let built = self.build();
        match built.unresolved.first() {
            Some(name) => Err(QueryError::UnboundParameter { name: name.clone() }),
            None => Ok(built),
        }
    }
}

// =============================================================================
// Placeholder Resolution
// =============================================================================

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Rewrites `$name` tokens to `?N` in a single left-to-right pass.
///
/// Names are numbered by first appearance among *bound* names, so the marker
/// numbers stay contiguous even when an unbound name sits between them.
fn resolve_parameters(raw: &str, params: &HashMap<String, SqlValue>) -> BuiltQuery {
    let bytes = raw.as_bytes();
    let mut sql = String::with_capacity(raw.len());
    let mut order: Vec<&str> = Vec::new();
    let mut args = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();

    let mut i = 0;
    let mut copied_to = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && is_identifier_byte(bytes[end]) {
            end += 1;
        }

        if end == start {
            // Lone '$' is not a placeholder.
            i += 1;
            continue;
        }

        let name = &raw[start..end];
        sql.push_str(&raw[copied_to..i]);

        match params.get(name) {
            Some(value) => {
                let position = match order.iter().position(|seen| *seen == name) {
                    Some(p) => p + 1,
                    None => {
                        order.push(name);
                        args.push(value.clone());
                        order.len()
                    }
                };
                let _ = write!(sql, "?{position}");
            }
            None => {
                if !unresolved.iter().any(|n| n == name) {
                    unresolved.push(name.to_string());
                }
                sql.push_str(&raw[i..end]);
            }
        }

        copied_to = end;
        i = end;
    }
    sql.push_str(&raw[copied_to..]);

    BuiltQuery {
        sql,
        args,
        unresolved,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
