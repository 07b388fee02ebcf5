//! Query descriptors and the fluent query builder.
//!
//! A [`Descriptor`] is the value sent to the service as the `query` parameter of the first
//! page request. It is never mutated once created: every [`QueryBuilder`] method returns a
//! new builder bound to a new descriptor, so a builder handed to someone else can never be
//! changed behind their back.
//!
//! # Query Building
//!
//! ```ignore
//! use montage::query::{QueryBuilder, SortDirection};
//! use serde_json::json;
//!
//! let base = QueryBuilder::new().filter([("genre", json!("drama"))]);
//! let recent = base.order_by("year", "desc")?.limit(10);
//!
//! // `base` still has no ordering and no limit.
//! assert_eq!(base.descriptor().limit, None);
//! assert_eq!(recent.descriptor().limit, Some(10));
//! ```

use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

use crate::error::{MontageError, MontageResult};

/// Number of documents requested per round trip when no batch size is given.
pub const DEFAULT_BATCH_SIZE: i64 = 1000;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// Returns the wire name of this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = MontageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(MontageError::InvalidArgument(format!(
                "ordering must be one of \"asc\" or \"desc\", got \"{other}\""
            ))),
        }
    }
}

/// The query parameters of one logical document query.
///
/// Serializes to the exact JSON object the service expects, defaults included:
///
/// ```json
/// {"filter": {}, "limit": null, "offset": null, "order_by": null, "ordering": "asc", "batch_size": 1000}
/// ```
///
/// Keys the client does not know about are accepted by [`Descriptor::from_overrides`] and
/// written back out unchanged. So are values for known keys that could not be coerced; those
/// are written in place of the field.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Field constraints; their meaning is defined by the service.
    pub filter: Map<String, Value>,
    /// Maximum number of documents for the whole query.
    pub limit: Option<i64>,
    /// Number of documents to skip.
    pub offset: Option<i64>,
    /// Field to sort by.
    pub order_by: Option<String>,
    /// Sort direction.
    pub ordering: SortDirection,
    /// Page size requested per round trip.
    pub batch_size: i64,
    extra: Map<String, Value>,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            filter: Map::new(),
            limit: None,
            offset: None,
            order_by: None,
            ordering: SortDirection::Asc,
            batch_size: DEFAULT_BATCH_SIZE,
            extra: Map::new(),
        }
    }
}

impl Descriptor {
    /// Creates a descriptor by merging `overrides` over the defaults.
    ///
    /// Only `ordering` is validated. Other known keys are coerced where the intent is clear:
    /// a `null` or empty-array `filter` is an empty filter, integral floats are integers and a
    /// `null` `batch_size` is [`DEFAULT_BATCH_SIZE`]. Anything else is kept verbatim in
    /// [`extra`](Descriptor::extra) along with unknown keys.
    ///
    /// # Errors
    ///
    /// Returns [`MontageError::InvalidArgument`] when `ordering` is not `"asc"` or `"desc"`.
    pub fn from_overrides(overrides: Map<String, Value>) -> MontageResult<Self> {
        let mut descriptor = Descriptor::default();

        for (key, value) in overrides {
            match (key.as_str(), value) {
                ("ordering", Value::String(ordering)) => descriptor.ordering = ordering.parse()?,
                ("ordering", other) => {
                    return Err(MontageError::InvalidArgument(format!(
                        "ordering must be one of \"asc\" or \"desc\", got {other}"
                    )));
                }
                ("filter", Value::Object(filter)) => descriptor.filter = filter,
                ("filter", Value::Null) => descriptor.filter = Map::new(),
                ("filter", Value::Array(items)) if items.is_empty() => {
                    descriptor.filter = Map::new();
                }
                ("limit", Value::Null) => descriptor.limit = None,
                ("offset", Value::Null) => descriptor.offset = None,
                ("order_by", Value::Null) => descriptor.order_by = None,
                ("order_by", Value::String(field)) => descriptor.order_by = Some(field),
                ("batch_size", Value::Null) => descriptor.batch_size = DEFAULT_BATCH_SIZE,
                (name @ ("limit" | "offset" | "batch_size"), value) => {
                    match (name, integral(&value)) {
                        ("limit", Some(n)) => descriptor.limit = Some(n),
                        ("offset", Some(n)) => descriptor.offset = Some(n),
                        ("batch_size", Some(n)) => descriptor.batch_size = n,
                        _ => {
                            descriptor.extra.insert(key.clone(), value);
                        }
                    }
                }
                (_, value) => {
                    descriptor.extra.insert(key.clone(), value);
                }
            }
        }

        Ok(descriptor)
    }

    /// Keys supplied at creation time that are not descriptor fields, plus values for known
    /// keys that were kept verbatim.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Encodes this descriptor as the JSON string sent in the `query` parameter.
    pub fn to_query_string(&self) -> MontageResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Returns `value` as an integer when it is one, or a float with no fractional part.
fn integral(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

// An `extra` value stored under a field name is written in place of that field.
impl Serialize for Descriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        macro_rules! field {
            ($key:literal, $value:expr) => {
                if !self.extra.contains_key($key) {
                    map.serialize_entry($key, $value)?;
                }
            };
        }

        field!("filter", &self.filter);
        field!("limit", &self.limit);
        field!("offset", &self.offset);
        field!("order_by", &self.order_by);
        field!("ordering", &self.ordering);
        field!("batch_size", &self.batch_size);
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Immutable, fluent builder over a [`Descriptor`].
///
/// Every method takes `&self` and returns a new builder, leaving the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    descriptor: Descriptor,
}

impl QueryBuilder {
    /// Creates a builder over the default descriptor.
    pub fn new() -> Self {
        QueryBuilder { descriptor: Descriptor::default() }
    }

    /// Creates a builder over the defaults merged with `overrides`.
    ///
    /// See [`Descriptor::from_overrides`].
    pub fn from_overrides(overrides: Map<String, Value>) -> MontageResult<Self> {
        Ok(QueryBuilder { descriptor: Descriptor::from_overrides(overrides)? })
    }

    /// Returns the descriptor this builder is bound to.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Copies the descriptor and applies `update`. A verbatim value kept in `extra` under one
    /// of `fields` is dropped so the new field value is the one sent.
    fn with(&self, fields: &[&str], update: impl FnOnce(&mut Descriptor)) -> Self {
        let mut descriptor = self.descriptor.clone();
        for field in fields {
            descriptor.extra.remove(*field);
        }
        update(&mut descriptor);
        QueryBuilder { descriptor }
    }

    /// Merges `constraints` over the existing filter.
    ///
    /// Keys already present are overridden, keys not mentioned are preserved.
    pub fn filter<K, V>(&self, constraints: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.with(&["filter"], |d| {
            d.filter.extend(
                constraints
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into())),
            )
        })
    }

    /// Sets the maximum number of documents. The value is passed to the service as given.
    pub fn limit(&self, limit: i64) -> Self {
        self.with(&["limit"], |d| d.limit = Some(limit))
    }

    /// Sets the number of documents to skip. The value is passed to the service as given.
    pub fn offset(&self, offset: i64) -> Self {
        self.with(&["offset"], |d| d.offset = Some(offset))
    }

    /// Sets the page size requested per round trip.
    pub fn batch_size(&self, batch_size: i64) -> Self {
        self.with(&["batch_size"], |d| d.batch_size = batch_size)
    }

    /// Sorts by `field` in the direction named by `direction` (`"asc"` or `"desc"`).
    ///
    /// # Errors
    ///
    /// Returns [`MontageError::InvalidArgument`] for any other direction. The receiver is
    /// unchanged either way.
    pub fn order_by(&self, field: impl Into<String>, direction: &str) -> MontageResult<Self> {
        let direction = direction.parse::<SortDirection>()?;

        Ok(self.order_by_direction(field, direction))
    }

    /// Sorts by `field` in the given direction.
    pub fn order_by_direction(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        let field = field.into();

        self.with(&["order_by", "ordering"], |d| {
            d.order_by = Some(field);
            d.ordering = direction;
        })
    }

    /// Returns the final descriptor.
    pub fn build(self) -> Descriptor {
        self.descriptor
    }
}

impl From<Descriptor> for QueryBuilder {
    fn from(descriptor: Descriptor) -> Self {
        QueryBuilder { descriptor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overrides(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn defaults_serialize_with_every_field() {
        let encoded = serde_json::to_value(Descriptor::default()).unwrap();

        assert_eq!(
            encoded,
            json!({
                "filter": {},
                "limit": null,
                "offset": null,
                "order_by": null,
                "ordering": "asc",
                "batch_size": 1000
            })
        );
    }

    #[test]
    fn overrides_merge_over_defaults_and_keep_unknown_keys() {
        let descriptor = Descriptor::from_overrides(overrides(json!({
            "limit": 5,
            "ordering": "desc",
            "pluck": ["title"]
        })))
        .unwrap();

        assert_eq!(descriptor.limit, Some(5));
        assert_eq!(descriptor.ordering, SortDirection::Desc);
        assert_eq!(descriptor.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(descriptor.extra().get("pluck"), Some(&json!(["title"])));

        let encoded = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(encoded["pluck"], json!(["title"]));
        assert_eq!(encoded["offset"], Value::Null);
    }

    #[test]
    fn invalid_ordering_in_overrides_is_rejected() {
        let result = Descriptor::from_overrides(overrides(json!({ "ordering": "sideways" })));

        assert!(matches!(result, Err(MontageError::InvalidArgument(_))));
    }

    #[test]
    fn integral_float_limit_becomes_an_integer() {
        let descriptor = Descriptor::from_overrides(overrides(json!({ "limit": 10.0 }))).unwrap();

        assert_eq!(descriptor.limit, Some(10));
        assert!(descriptor.extra().is_empty());
    }

    #[test]
    fn uncoercible_limit_is_kept_verbatim() {
        let descriptor = Descriptor::from_overrides(overrides(json!({ "limit": "10" }))).unwrap();

        assert_eq!(descriptor.limit, None);
        assert_eq!(descriptor.extra().get("limit"), Some(&json!("10")));

        let encoded = descriptor.to_query_string().unwrap();
        assert_eq!(encoded.matches("\"limit\"").count(), 1);
        let encoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(encoded["limit"], json!("10"));
        assert_eq!(encoded["batch_size"], json!(1000));

        let limited = QueryBuilder::from(descriptor).limit(5).build();
        assert_eq!(limited.extra().get("limit"), None);
        assert_eq!(serde_json::to_value(&limited).unwrap()["limit"], json!(5));
    }

    #[test]
    fn empty_array_filter_is_an_empty_filter() {
        let descriptor = Descriptor::from_overrides(overrides(json!({ "filter": [] }))).unwrap();

        assert!(descriptor.filter.is_empty());
        assert_eq!(serde_json::to_value(&descriptor).unwrap()["filter"], json!({}));
    }

    #[test]
    fn null_batch_size_falls_back_to_the_default() {
        let descriptor =
            Descriptor::from_overrides(overrides(json!({ "batch_size": null, "filter": null })))
                .unwrap();

        assert_eq!(descriptor, Descriptor::default());
    }

    #[test]
    fn empty_overrides_default_to_ascending() {
        let descriptor = Descriptor::from_overrides(Map::new()).unwrap();

        assert_eq!(descriptor, Descriptor::default());
        assert_eq!(descriptor.ordering, SortDirection::Asc);
    }

    #[test]
    fn filters_accumulate_across_calls() {
        let builder = QueryBuilder::new()
            .filter([("a", 1)])
            .filter([("b", 2)]);

        assert_eq!(Value::Object(builder.descriptor().filter.clone()), json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn later_filter_overrides_same_key() {
        let builder = QueryBuilder::new()
            .filter([("a", 1)])
            .filter([("a", 2)]);

        assert_eq!(Value::Object(builder.descriptor().filter.clone()), json!({ "a": 2 }));
    }

    #[test]
    fn invalid_direction_leaves_builder_unchanged() {
        let builder = QueryBuilder::new().order_by("year", "desc").unwrap();
        let before = builder.clone();

        let result = builder.order_by("title", "sideways");

        assert!(matches!(result, Err(MontageError::InvalidArgument(_))));
        assert_eq!(builder, before);
        assert_eq!(builder.descriptor().order_by.as_deref(), Some("year"));
        assert_eq!(builder.descriptor().ordering, SortDirection::Desc);
    }

    #[test]
    fn mutators_do_not_touch_the_receiver() {
        let base = QueryBuilder::new().filter([("genre", "drama")]);
        let limited = base.limit(10).offset(20).batch_size(50);

        assert_eq!(base.descriptor().limit, None);
        assert_eq!(base.descriptor().offset, None);
        assert_eq!(base.descriptor().batch_size, DEFAULT_BATCH_SIZE);

        assert_eq!(limited.descriptor().limit, Some(10));
        assert_eq!(limited.descriptor().offset, Some(20));
        assert_eq!(limited.descriptor().batch_size, 50);
        assert_eq!(limited.descriptor().filter.get("genre"), Some(&json!("drama")));
    }

    #[test]
    fn limit_and_offset_are_not_validated() {
        let descriptor = QueryBuilder::new().limit(-1).offset(0).build();

        assert_eq!(descriptor.limit, Some(-1));
        assert_eq!(descriptor.offset, Some(0));
    }

    #[test]
    fn sort_direction_parses_exact_wire_names() {
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!(SortDirection::Desc.to_string(), "desc");
        assert!("ASC".parse::<SortDirection>().is_err());
    }
}
