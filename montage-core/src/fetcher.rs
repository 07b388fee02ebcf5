//! Single-page requests against a schema's query endpoint.

use tracing::debug;

use crate::{
    error::MontageResult,
    page::{Document, Page},
    query::Descriptor,
    transport::{Method, RequestArgs, Transport},
};

/// Issues page requests for one schema.
///
/// The fetcher holds no state between calls: the first page is requested with the full
/// descriptor, every later page with the cursor returned by the page before it.
#[derive(Debug)]
pub struct PageFetcher<'a, T: Transport + ?Sized> {
    transport: &'a T,
    path: String,
}

impl<'a, T: Transport + ?Sized> Clone for PageFetcher<'a, T> {
    fn clone(&self) -> Self {
        Self { transport: self.transport, path: self.path.clone() }
    }
}

impl<'a, T: Transport + ?Sized> PageFetcher<'a, T> {
    /// Creates a fetcher for the query endpoint at `path`.
    pub fn new(transport: &'a T, path: impl Into<String>) -> Self {
        Self { transport, path: path.into() }
    }

    /// The query endpoint path this fetcher requests.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Requests the first page, sending `descriptor` JSON-encoded as the `query` parameter.
    pub async fn fetch_first(&self, descriptor: &Descriptor) -> MontageResult<Page<Document>> {
        debug!(path = %self.path, "fetching first page");

        let args = RequestArgs::new().with_query("query", descriptor.to_query_string()?);

        self.fetch(args).await
    }

    /// Requests the page identified by `cursor`. The descriptor is not resent.
    pub async fn fetch_next(&self, cursor: &str) -> MontageResult<Page<Document>> {
        debug!(path = %self.path, cursor, "fetching next page");

        self.fetch(RequestArgs::new().with_query("cursor", cursor)).await
    }

    async fn fetch(&self, args: RequestArgs) -> MontageResult<Page<Document>> {
        let body = self
            .transport
            .request(Method::Get, &self.path, args)
            .await?;

        Ok(serde_json::from_value(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::{error::MontageError, query::QueryBuilder, testing::ScriptedTransport};

    #[tokio::test]
    async fn first_page_sends_only_the_encoded_descriptor() {
        let transport = ScriptedTransport::new().respond(json!({ "data": [{ "a": 1 }] }));
        let fetcher = PageFetcher::new(&transport, "api/v1/schemas/movies/query/");
        let descriptor = QueryBuilder::new().order_by("year", "desc").unwrap().build();

        let page = fetcher.fetch_first(&descriptor).await.unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.cursor, None);

        let calls = transport.calls();
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(calls[0].path, "api/v1/schemas/movies/query/");
        assert_eq!(
            calls[0].args,
            RequestArgs::new().with_query("query", descriptor.to_query_string().unwrap())
        );
    }

    #[tokio::test]
    async fn next_page_sends_the_cursor_verbatim() {
        let transport = ScriptedTransport::new().respond(json!({ "data": [], "cursors": { "next": "tok2" } }));
        let fetcher = PageFetcher::new(&transport, "api/v1/schemas/movies/query/");

        let page = fetcher.fetch_next("tok1==").await.unwrap();

        assert_eq!(page.cursor.as_deref(), Some("tok2"));
        assert_eq!(transport.calls()[0].args, RequestArgs::new().with_query("cursor", "tok1=="));
    }

    #[tokio::test]
    async fn transport_errors_pass_through_unchanged() {
        let transport = ScriptedTransport::new().fail(MontageError::service(Some(502), "bad gateway"));
        let fetcher = PageFetcher::new(&transport, "api/v1/schemas/movies/query/");

        assert_eq!(
            fetcher.fetch_next("tok1").await,
            Err(MontageError::service(Some(502), "bad gateway"))
        );
    }
}
