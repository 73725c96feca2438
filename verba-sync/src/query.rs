//! Query descriptions for remote selects and deletes.
//!
//! The engine only ever needs equality/inequality filters and an
//! `updated_at` ordering, so queries are plain data that each remote client
//! renders in its own dialect.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
}

impl FilterOp {
    /// PostgREST operator prefix.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
        }
    }
}

/// A single `column <op> value` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn neq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Neq,
            value: value.into(),
        }
    }

    /// Evaluates the predicate against a row. Missing columns never match `Eq`
    /// and always match `Neq`.
    pub fn matches(&self, row: &verba_types::Record) -> bool {
        let actual = row.get(&self.column).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        match self.op {
            FilterOp::Eq => actual.as_deref() == Some(self.value.as_str()),
            FilterOp::Neq => actual.as_deref() != Some(self.value.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    /// Freshest rows first.
    pub fn newest_first() -> Self {
        Self {
            column: "updated_at".to_string(),
            descending: true,
        }
    }
}

/// A filtered, optionally ordered select.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectQuery {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds a filter when one is given; used for optional ownership scoping.
    pub fn filter_opt(mut self, filter: Option<Filter>) -> Self {
        self.filters.extend(filter);
        self
    }

    pub fn order(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }
}
