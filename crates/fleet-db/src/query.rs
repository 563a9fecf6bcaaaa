//! Query constraints and their client-side evaluation
//!
//! All `Where` filters apply first, then `OrderBy` keys in the order given,
//! then `Limit`. Documents missing a filtered or ordered field never match.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::{DbError, Document};

/// Comparison operator of a `Where` constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "array-contains")]
    ArrayContains,
    #[serde(rename = "in")]
    In,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::NotEq => "!=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::In => "in",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(FilterOp::Eq),
            "!=" => Ok(FilterOp::NotEq),
            "<" => Ok(FilterOp::Lt),
            "<=" => Ok(FilterOp::Lte),
            ">" => Ok(FilterOp::Gt),
            ">=" => Ok(FilterOp::Gte),
            "array-contains" => Ok(FilterOp::ArrayContains),
            "in" => Ok(FilterOp::In),
            other => Err(DbError::invalid_query(format!("unknown operator '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One query constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryConstraint {
    Where {
        field: String,
        op: FilterOp,
        value: Value,
    },
    OrderBy {
        field: String,
        #[serde(default)]
        direction: Direction,
    },
    Limit {
        count: usize,
    },
}

impl QueryConstraint {
    pub fn filter(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self::Where {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn order_by(field: impl Into<String>, direction: Direction) -> Self {
        Self::OrderBy {
            field: field.into(),
            direction,
        }
    }

    pub fn limit(count: usize) -> Self {
        Self::Limit { count }
    }
}

/// Reject constraints that can never be evaluated
pub fn validate(constraints: &[QueryConstraint]) -> Result<(), DbError> {
    for constraint in constraints {
        match constraint {
            QueryConstraint::Where { field, .. } | QueryConstraint::OrderBy { field, .. }
                if field.trim().is_empty() =>
            {
                return Err(DbError::invalid_query("field path must not be empty"));
            }
            QueryConstraint::Where {
                op: FilterOp::In,
                value,
                field,
            } if !value.is_array() => {
                return Err(DbError::invalid_query(format!(
                    "'in' filter on '{}' needs an array value",
                    field
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Evaluate constraints against an in-memory document set
pub fn apply(mut documents: Vec<Document>, constraints: &[QueryConstraint]) -> Vec<Document> {
    for constraint in constraints {
        if let QueryConstraint::Where { field, op, value } = constraint {
            documents.retain(|doc| matches(doc, field, *op, value));
        }
    }

    let order: Vec<(&str, Direction)> = constraints
        .iter()
        .filter_map(|c| match c {
            QueryConstraint::OrderBy { field, direction } => Some((field.as_str(), *direction)),
            _ => None,
        })
        .collect();

    if !order.is_empty() {
        documents.retain(|doc| order.iter().all(|(field, _)| lookup(doc, field).is_some()));
        documents.sort_by(|a, b| {
            for (field, direction) in &order {
                let ord = match (lookup(a, field), lookup(b, field)) {
                    (Some(x), Some(y)) => total_order(&x, &y),
                    _ => Ordering::Equal,
                };
                let ord = match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    let limit = constraints.iter().rev().find_map(|c| match c {
        QueryConstraint::Limit { count } => Some(*count),
        _ => None,
    });
    if let Some(count) = limit {
        documents.truncate(count);
    }

    documents
}

fn lookup(doc: &Document, field: &str) -> Option<Value> {
    match doc.field(field) {
        Some(value) => Some(value.clone()),
        None if field == "id" => Some(Value::String(doc.id.clone())),
        None => None,
    }
}

fn matches(doc: &Document, field: &str, op: FilterOp, expected: &Value) -> bool {
    let Some(actual) = lookup(doc, field) else {
        return false;
    };

    match op {
        FilterOp::Eq => loose_eq(&actual, expected),
        FilterOp::NotEq => !loose_eq(&actual, expected),
        FilterOp::Lt => compare(&actual, expected) == Some(Ordering::Less),
        FilterOp::Lte => matches!(
            compare(&actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::Gt => compare(&actual, expected) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(
            compare(&actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::ArrayContains => actual
            .as_array()
            .is_some_and(|items| items.iter().any(|item| loose_eq(item, expected))),
        FilterOp::In => expected
            .as_array()
            .is_some_and(|options| options.iter().any(|option| loose_eq(&actual, option))),
    }
}

/// Equality that treats 1 and 1.0 as the same number
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between values of the same scalar type
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Sort order across types: null < bool < number < string < array < object
fn total_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    compare(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> Vec<Document> {
        vec![
            Document::from_value("u1", json!({"age": 17, "city": "London", "tags": ["a"]})).unwrap(),
            Document::from_value("u2", json!({"age": 30, "city": "New York", "tags": ["a", "b"]}))
                .unwrap(),
            Document::from_value("u3", json!({"age": 45.0, "city": "New York"})).unwrap(),
            Document::from_value("u4", json!({"city": "Paris"})).unwrap(),
        ]
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_where_filters_combine() {
        let result = apply(
            users(),
            &[
                QueryConstraint::filter("age", FilterOp::Gt, 18),
                QueryConstraint::filter("city", FilterOp::Eq, "New York"),
            ],
        );
        assert_eq!(ids(&result), vec!["u2", "u3"]);
    }

    #[test]
    fn test_missing_field_never_matches() {
        let result = apply(users(), &[QueryConstraint::filter("age", FilterOp::NotEq, 30)]);
        assert_eq!(ids(&result), vec!["u1", "u3"]);
    }

    #[test]
    fn test_array_contains_and_in() {
        let result = apply(
            users(),
            &[QueryConstraint::filter("tags", FilterOp::ArrayContains, "b")],
        );
        assert_eq!(ids(&result), vec!["u2"]);

        let result = apply(
            users(),
            &[QueryConstraint::filter("city", FilterOp::In, json!(["Paris", "London"]))],
        );
        assert_eq!(ids(&result), vec!["u1", "u4"]);
    }

    #[test]
    fn test_numbers_compare_across_representations() {
        let result = apply(users(), &[QueryConstraint::filter("age", FilterOp::Eq, 45)]);
        assert_eq!(ids(&result), vec!["u3"]);
    }

    #[test]
    fn test_order_and_limit() {
        let result = apply(
            users(),
            &[
                QueryConstraint::limit(2),
                QueryConstraint::order_by("age", Direction::Desc),
            ],
        );
        assert_eq!(ids(&result), vec!["u3", "u2"]);

        let result = apply(users(), &[QueryConstraint::order_by("id", Direction::Desc)]);
        assert_eq!(ids(&result), vec!["u4", "u3", "u2", "u1"]);
    }

    #[test]
    fn test_constraint_wire_format() {
        let json = r#"[
            {"type": "where", "field": "age", "op": ">=", "value": 18},
            {"type": "orderBy", "field": "age"},
            {"type": "limit", "count": 5}
        ]"#;
        let constraints: Vec<QueryConstraint> = serde_json::from_str(json).unwrap();

        assert_eq!(constraints[0], QueryConstraint::filter("age", FilterOp::Gte, 18));
        assert_eq!(constraints[1], QueryConstraint::order_by("age", Direction::Asc));
        assert_eq!(constraints[2], QueryConstraint::limit(5));
    }

    #[test]
    fn test_validation() {
        assert!(validate(&[QueryConstraint::filter("city", FilterOp::In, "Paris")]).is_err());
        assert!(validate(&[QueryConstraint::order_by(" ", Direction::Asc)]).is_err());
        assert!(validate(&[QueryConstraint::filter("city", FilterOp::In, json!(["Paris"]))]).is_ok());
        assert!("~=".parse::<FilterOp>().is_err());
        assert_eq!("array-contains".parse::<FilterOp>().unwrap(), FilterOp::ArrayContains);
    }
}
