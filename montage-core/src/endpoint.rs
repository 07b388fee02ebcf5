//! Versioned endpoint paths of the Montage API.
//!
//! Every request the client makes goes to a path produced here, e.g.
//! `api/v1/schemas/movies/query/`. Paths are relative to the transport's base URL.

use std::{fmt, str::FromStr};

use crate::error::{MontageError, MontageResult};

/// A logical endpoint of the Montage API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `auth/`
    Auth,
    /// `auth/user/`
    User,
    /// `schemas/`
    SchemaList,
    /// `schemas/{schema}/`
    SchemaDetail,
    /// `schemas/{schema}/query/`
    DocumentQuery,
    /// `schemas/{schema}/save/`
    DocumentSave,
    /// `schemas/{schema}/{document}/`
    DocumentDetail,
    /// `files/`
    FileList,
    /// `files/{file}/`
    FileDetail,
}

impl Endpoint {
    /// All endpoints, in table order.
    pub const ALL: [Endpoint; 9] = [
        Endpoint::Auth,
        Endpoint::User,
        Endpoint::SchemaList,
        Endpoint::SchemaDetail,
        Endpoint::DocumentQuery,
        Endpoint::DocumentSave,
        Endpoint::DocumentDetail,
        Endpoint::FileList,
        Endpoint::FileDetail,
    ];

    /// The key used to name this endpoint, e.g. `document-query`.
    pub fn key(&self) -> &'static str {
        match self {
            Endpoint::Auth => "auth",
            Endpoint::User => "user",
            Endpoint::SchemaList => "schema-list",
            Endpoint::SchemaDetail => "schema-detail",
            Endpoint::DocumentQuery => "document-query",
            Endpoint::DocumentSave => "document-save",
            Endpoint::DocumentDetail => "document-detail",
            Endpoint::FileList => "file-list",
            Endpoint::FileDetail => "file-detail",
        }
    }

    /// Renders the unversioned path of this endpoint.
    ///
    /// Arguments the endpoint does not use are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MontageError::InvalidArgument`] when a placeholder of the template has no
    /// matching argument.
    pub fn path(
        &self,
        schema: Option<&str>,
        document_id: Option<&str>,
        file_id: Option<&str>,
    ) -> MontageResult<String> {
        Ok(match self {
            Endpoint::Auth => "auth/".to_string(),
            Endpoint::User => "auth/user/".to_string(),
            Endpoint::SchemaList => "schemas/".to_string(),
            Endpoint::SchemaDetail => format!("schemas/{}/", self.required(schema, "schema name")?),
            Endpoint::DocumentQuery => {
                format!("schemas/{}/query/", self.required(schema, "schema name")?)
            }
            Endpoint::DocumentSave => {
                format!("schemas/{}/save/", self.required(schema, "schema name")?)
            }
            Endpoint::DocumentDetail => format!(
                "schemas/{}/{}/",
                self.required(schema, "schema name")?,
                self.required(document_id, "document id")?
            ),
            Endpoint::FileList => "files/".to_string(),
            Endpoint::FileDetail => format!("files/{}/", self.required(file_id, "file id")?),
        })
    }

    fn required<'v>(&self, value: Option<&'v str>, what: &str) -> MontageResult<&'v str> {
        value.ok_or_else(|| {
            MontageError::InvalidArgument(format!(
                "endpoint \"{}\" requires a {what}",
                self.key()
            ))
        })
    }

    /// Renders the path of this endpoint prefixed with the API version, e.g.
    /// `api/v1/schemas/movies/query/`.
    pub fn url(
        &self,
        version: u32,
        schema: Option<&str>,
        document_id: Option<&str>,
        file_id: Option<&str>,
    ) -> MontageResult<String> {
        Ok(format!("api/v{version}/{}", self.path(schema, document_id, file_id)?))
    }

    /// Renders the versioned [`DocumentQuery`](Endpoint::DocumentQuery) path of `schema`.
    pub fn query_url(version: u32, schema: &str) -> String {
        format!("api/v{version}/schemas/{schema}/query/")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Endpoint {
    type Err = MontageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .into_iter()
            .find(|endpoint| endpoint.key() == s)
            .ok_or_else(|| MontageError::UnknownEndpoint(s.to_string()))
    }
}

/// Renders the versioned path for the endpoint named `key`.
///
/// # Errors
///
/// Returns [`MontageError::UnknownEndpoint`] when `key` is not a known endpoint.
pub fn url_for(
    version: u32,
    key: &str,
    schema: Option<&str>,
    document_id: Option<&str>,
    file_id: Option<&str>,
) -> MontageResult<String> {
    key.parse::<Endpoint>()?
        .url(version, schema, document_id, file_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_endpoint() {
        let cases = [
            ("auth", "api/v1/auth/"),
            ("user", "api/v1/auth/user/"),
            ("schema-list", "api/v1/schemas/"),
            ("schema-detail", "api/v1/schemas/movies/"),
            ("document-query", "api/v1/schemas/movies/query/"),
            ("document-save", "api/v1/schemas/movies/save/"),
            ("document-detail", "api/v1/schemas/movies/42/"),
            ("file-list", "api/v1/files/"),
            ("file-detail", "api/v1/files/f-1/"),
        ];

        for (key, expected) in cases {
            assert_eq!(
                url_for(1, key, Some("movies"), Some("42"), Some("f-1")).unwrap(),
                expected,
                "endpoint {key}"
            );
        }
    }

    #[test]
    fn version_prefixes_the_path() {
        assert_eq!(
            Endpoint::DocumentQuery.url(2, Some("movies"), None, None).unwrap(),
            "api/v2/schemas/movies/query/"
        );
    }

    #[test]
    fn query_url_matches_the_document_query_endpoint() {
        assert_eq!(
            Endpoint::query_url(3, "movies"),
            Endpoint::DocumentQuery.url(3, Some("movies"), None, None).unwrap()
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert_eq!(
            url_for(1, "document-explode", Some("movies"), None, None),
            Err(MontageError::UnknownEndpoint("document-explode".to_string()))
        );
    }

    #[test]
    fn missing_placeholder_is_an_invalid_argument() {
        assert!(matches!(
            Endpoint::DocumentDetail.path(Some("movies"), None, None),
            Err(MontageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn keys_round_trip_through_from_str() {
        for endpoint in Endpoint::ALL {
            assert_eq!(endpoint.key().parse::<Endpoint>().unwrap(), endpoint);
        }
    }
}
