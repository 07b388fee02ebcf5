//! Page results returned by the document query endpoint.
//!
//! On the wire a page looks like:
//!
//! ```json
//! {"data": [{"title": "Alien"}, {"title": "Heat"}], "cursors": {"next": "c2Vjb25k"}}
//! ```
//!
//! The `next` cursor is opaque. It is absent, `null` or otherwise falsy on the last page.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// An opaque JSON document as returned by the service.
pub type Document = Map<String, Value>;

/// A single page of query results.
///
/// # Example
///
/// ```ignore
/// use montage::page::Page;
///
/// let page: Page<u32> = Page::builder(vec![1, 2])
///     .with_cursor(Some("tok1".to_string()))
///     .build();
///
/// assert!(page.has_next());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T = Document> {
    /// The documents of this page, in service order.
    pub data: Vec<T>,
    /// Token for the next page, if any.
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// Creates a new builder for constructing a page.
    pub fn builder(data: Vec<T>) -> PageBuilder<T> {
        PageBuilder::new(data)
    }

    /// Whether another page follows this one.
    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self { data: Vec::new(), cursor: None }
    }
}

/// Builder for constructing [`Page`] instances.
pub struct PageBuilder<T> {
    data: Vec<T>,
    cursor: Option<String>,
}

impl<T> PageBuilder<T> {
    /// Creates a new builder with the given documents.
    pub fn new(data: Vec<T>) -> Self {
        Self { data, cursor: None }
    }

    /// Sets the next cursor (or `None` if this is the last page).
    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Builds and returns the final [`Page`] instance.
    pub fn build(self) -> Page<T> {
        Page { data: self.data, cursor: self.cursor }
    }
}

#[derive(Deserialize)]
struct WirePage<T> {
    data: Vec<T>,
    #[serde(default)]
    cursors: Option<WireCursors>,
}

#[derive(Deserialize)]
struct WireCursors {
    #[serde(default, deserialize_with = "deserialize_token")]
    next: Option<String>,
}

/// Reads a cursor token, treating every falsy JSON value as "no next page".
fn deserialize_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(token)) if token.is_empty() || token == "0" => None,
        Some(Value::String(token)) => Some(token),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(Value::Array(items)) if items.is_empty() => None,
        Some(other) => Some(other.to_string()),
    })
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Cursors<'a> {
            next: Option<&'a str>,
        }

        #[derive(Serialize)]
        struct Wire<'a, T> {
            data: &'a [T],
            cursors: Cursors<'a>,
        }

        Wire {
            data: &self.data,
            cursors: Cursors { next: self.cursor.as_deref() },
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Page<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WirePage::<T>::deserialize(deserializer)?;

        Ok(Page {
            data: wire.data,
            cursor: wire.cursors.and_then(|c| c.next),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Page {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn reads_data_and_next_cursor() {
        let page = parse(json!({
            "data": [{ "title": "Alien" }, { "title": "Heat" }],
            "cursors": { "next": "tok1" }
        }));

        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0]["title"], json!("Alien"));
        assert_eq!(page.cursor.as_deref(), Some("tok1"));
        assert!(page.has_next());
    }

    #[test]
    fn missing_or_falsy_cursor_ends_pagination() {
        for body in [
            json!({ "data": [] }),
            json!({ "data": [], "cursors": null }),
            json!({ "data": [], "cursors": {} }),
            json!({ "data": [], "cursors": { "next": null } }),
            json!({ "data": [], "cursors": { "next": false } }),
            json!({ "data": [], "cursors": { "next": "" } }),
            json!({ "data": [], "cursors": { "next": "0" } }),
            json!({ "data": [], "cursors": { "next": 0 } }),
            json!({ "data": [], "cursors": { "next": [] } }),
        ] {
            assert_eq!(parse(body.clone()).cursor, None, "body {body}");
        }
    }

    #[test]
    fn non_string_token_is_kept_as_json_text() {
        let page = parse(json!({ "data": [], "cursors": { "next": 17 } }));

        assert_eq!(page.cursor.as_deref(), Some("17"));
    }

    #[test]
    fn page_without_data_is_rejected() {
        let result = serde_json::from_value::<Page>(json!({ "cursors": { "next": "tok" } }));

        assert!(result.is_err());
    }

    #[test]
    fn serializes_to_wire_shape() {
        let page: Page<u32> = Page::builder(vec![1, 2])
            .with_cursor(Some("tok1".to_string()))
            .build();

        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({ "data": [1, 2], "cursors": { "next": "tok1" } })
        );
    }
}
