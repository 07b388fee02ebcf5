//! Query evaluation for the in-memory service.
//!
//! Filters are equality constraints on top-level fields; ordering compares one field with
//! the same loose rules the hosted service applies to JSON values.

use serde_json::{Map, Value};
use std::{cmp::Ordering, collections::HashMap};

use montage_core::{
    page::Document,
    query::{Descriptor, SortDirection},
};

/// Comparable view of a JSON value.
///
/// Integers and floats are compared as `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value.as_f64().map_or(Comparable::Null, Comparable::Number),
            Value::String(value) => Comparable::String(value),
            Value::Array(values) => Comparable::Array(values.iter().map(Comparable::from).collect()),
            Value::Object(map) => Comparable::Map(
                map.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> Comparable<'a> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Map(_) => 5,
        }
    }

    /// Total order used for sorting: values order by kind first
    /// (null, bool, number, string, array, object), then by value. Arrays and objects
    /// compare equal to their own kind.
    pub(crate) fn order(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn field<'a>(document: &'a Document, name: &str) -> Comparable<'a> {
    document.get(name).map(Comparable::from).unwrap_or(Comparable::Null)
}

/// Returns whether `document` satisfies every constraint of `filter`.
///
/// A missing field only matches a `null` constraint.
pub(crate) fn matches(document: &Document, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(name, expected)| field(document, name) == Comparable::from(expected))
}

/// Applies `descriptor` to `documents`: filter, then ordering, then offset and limit.
///
/// Missing fields sort as `null`, before every other value. The sort is stable, so documents
/// that compare equal keep their stored order. A negative offset counts as zero and a
/// negative limit matches nothing.
pub(crate) fn evaluate<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    descriptor: &Descriptor,
) -> Vec<Document> {
    let mut selected = documents
        .into_iter()
        .filter(|document| matches(document, &descriptor.filter))
        .cloned()
        .collect::<Vec<_>>();

    if let Some(order_by) = &descriptor.order_by {
        selected.sort_by(|a, b| {
            let (left, right) = (field(a, order_by), field(b, order_by));

            match descriptor.ordering {
                SortDirection::Asc => left.order(&right),
                SortDirection::Desc => right.order(&left),
            }
        });
    }

    let offset = descriptor.offset.map_or(0, |offset| usize::try_from(offset).unwrap_or(0));
    let limit = descriptor
        .limit
        .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(0));

    selected.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_core::query::QueryBuilder;
    use serde_json::json;

    fn docs() -> Vec<Document> {
        [
            json!({ "title": "Alien", "year": 1979, "genre": "horror" }),
            json!({ "title": "Heat", "year": 1995, "genre": "crime" }),
            json!({ "title": "Ran", "year": 1985.0, "genre": "drama" }),
            json!({ "title": "Untitled", "genre": "drama" }),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
    }

    fn titles(documents: &[Document]) -> Vec<&str> {
        documents.iter().filter_map(|d| d["title"].as_str()).collect()
    }

    #[test]
    fn numbers_compare_across_integer_and_float() {
        let (a, b) = (json!(1985), json!(1985.0));

        assert!(Comparable::from(&a) == Comparable::from(&b));
        assert_eq!(
            Comparable::from(&json!(1)).order(&Comparable::from(&json!(2.5))),
            Ordering::Less
        );
        assert_eq!(
            Comparable::from(&json!(null)).order(&Comparable::from(&json!(1))),
            Ordering::Less
        );
        assert_eq!(
            Comparable::from(&json!("1")).order(&Comparable::from(&json!(1))),
            Ordering::Greater
        );
    }

    #[test]
    fn filters_on_equality() {
        let all = docs();
        let descriptor = QueryBuilder::new().filter([("genre", "drama")]).build();

        assert_eq!(titles(&evaluate(&all, &descriptor)), vec!["Ran", "Untitled"]);

        let descriptor = QueryBuilder::new().filter([("year", json!(null))]).build();
        assert_eq!(titles(&evaluate(&all, &descriptor)), vec!["Untitled"]);
    }

    #[test]
    fn orders_then_applies_offset_and_limit() {
        let all = docs();
        let descriptor = QueryBuilder::new()
            .order_by("year", "desc")
            .unwrap()
            .offset(1)
            .limit(2)
            .build();

        assert_eq!(titles(&evaluate(&all, &descriptor)), vec!["Ran", "Alien"]);
    }

    #[test]
    fn negative_bounds_are_tolerated() {
        let all = docs();

        let descriptor = QueryBuilder::new().offset(-5).build();
        assert_eq!(evaluate(&all, &descriptor).len(), 4);

        let descriptor = QueryBuilder::new().limit(-1).build();
        assert!(evaluate(&all, &descriptor).is_empty());
    }
}
