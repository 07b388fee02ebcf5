//! Schema handles and document queries.
//!
//! A [`Schema`] is the client-side handle of one named collection. It builds [`Documents`]
//! queries and performs single-document requests.
//!
//! # Example
//!
//! ```ignore
//! let movies = client.schema("movies");
//!
//! let dramas = movies
//!     .documents()
//!     .filter([("genre", "drama")])
//!     .order_by("year", "desc")?;
//!
//! // Every call to `iter` starts over from the first page.
//! let first_pass = dramas.iter().try_collect_all().await?;
//! let second_pass = dramas.iter().try_collect_all().await?;
//!
//! let saved = movies.save(document).await?;
//! movies.delete(saved["id"].as_str().unwrap()).await?;
//! ```

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    client::{Montage, response_data},
    endpoint::Endpoint,
    error::{MontageError, MontageResult},
    fetcher::PageFetcher,
    page::Document,
    query::{QueryBuilder, SortDirection},
    sequence::{DocumentSequence, TypedDocumentSequence},
    transport::{Method, RequestArgs, Transport},
};

/// A handle on one schema of a Montage account.
#[derive(Debug)]
pub struct Schema<'a, T: Transport> {
    name: String,
    client: &'a Montage<T>,
}

impl<'a, T: Transport> Clone for Schema<'a, T> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), client: self.client }
    }
}

impl<'a, T: Transport> Schema<'a, T> {
    pub(crate) fn new(name: String, client: &'a Montage<T>) -> Self {
        Self { name, client }
    }

    /// Returns the name of this schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the client this schema belongs to.
    pub fn client(&self) -> &'a Montage<T> {
        self.client
    }

    fn url(&self, endpoint: Endpoint, document_id: Option<&str>) -> MontageResult<String> {
        self.client
            .endpoint_url(endpoint, Some(&self.name), document_id, None)
    }

    fn query_url(&self) -> String {
        Endpoint::query_url(self.client.version(), &self.name)
    }

    async fn send(
        &self,
        method: Method,
        endpoint: Endpoint,
        document_id: Option<&str>,
        args: RequestArgs,
    ) -> MontageResult<Value> {
        let url = self.url(endpoint, document_id)?;

        Ok(response_data(self.client.request(method, &url, args).await?))
    }

    /// Returns the service's description of this schema.
    pub async fn detail(&self) -> MontageResult<Value> {
        self.send(Method::Get, Endpoint::SchemaDetail, None, RequestArgs::new())
            .await
    }

    /// Returns a query over every document of this schema.
    pub fn documents(&self) -> Documents<'a, T> {
        Documents::new(self.clone(), QueryBuilder::new())
    }

    /// Returns a query whose descriptor is the defaults merged with `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`MontageError::InvalidArgument`] when the `ordering` override is invalid.
    pub fn documents_with(&self, overrides: Map<String, Value>) -> MontageResult<Documents<'a, T>> {
        Ok(Documents::new(self.clone(), QueryBuilder::from_overrides(overrides)?))
    }

    /// Returns a fresh document sequence for `builder`.
    pub fn query(&self, builder: &QueryBuilder) -> MontageResult<DocumentSequence<'a, Montage<T>>> {
        let fetcher = PageFetcher::new(self.client, self.query_url());

        Ok(DocumentSequence::new(fetcher, builder.descriptor().clone()))
    }

    /// Fetches one document by id.
    pub async fn get(&self, id: &str) -> MontageResult<Document> {
        into_document(
            self.send(Method::Get, Endpoint::DocumentDetail, Some(id), RequestArgs::new())
                .await?,
        )
    }

    /// Fetches one document by id and decodes it into `D`.
    pub async fn get_as<D: DeserializeOwned>(&self, id: &str) -> MontageResult<D> {
        Ok(serde_json::from_value(Value::Object(self.get(id).await?))?)
    }

    /// Saves a batch of documents and returns them as stored by the service.
    pub async fn save_many(&self, documents: Vec<Document>) -> MontageResult<Vec<Document>> {
        let body = serde_json::to_string(&documents)?;

        match self
            .send(Method::Post, Endpoint::DocumentSave, None, RequestArgs::new().with_body(body))
            .await?
        {
            Value::Array(saved) => saved.into_iter().map(into_document).collect(),
            other => Ok(vec![into_document(other)?]),
        }
    }

    /// Saves one document and returns it as stored by the service.
    pub async fn save(&self, document: Document) -> MontageResult<Document> {
        self.save_many(vec![document])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MontageError::Serialization("save returned no document".into()))
    }

    /// Serializes `document`, saves it and decodes the stored version.
    pub async fn save_typed<D>(&self, document: &D) -> MontageResult<D>
    where
        D: Serialize + DeserializeOwned,
    {
        let saved = self.save(into_document(serde_json::to_value(document)?)?).await?;

        Ok(serde_json::from_value(Value::Object(saved))?)
    }

    /// Replaces the document `id` and returns the stored version.
    pub async fn update(&self, id: &str, document: Document) -> MontageResult<Document> {
        let body = serde_json::to_string(&document)?;

        into_document(
            self.send(Method::Post, Endpoint::DocumentDetail, Some(id), RequestArgs::new().with_body(body))
                .await?,
        )
    }

    /// Deletes the document `id`.
    pub async fn delete(&self, id: &str) -> MontageResult<()> {
        self.send(Method::Delete, Endpoint::DocumentDetail, Some(id), RequestArgs::new())
            .await?;

        Ok(())
    }
}

fn into_document(value: Value) -> MontageResult<Document> {
    match value {
        Value::Object(document) => Ok(document),
        other => Err(MontageError::Serialization(format!(
            "expected a document object, got {other}"
        ))),
    }
}

/// A document query bound to a schema.
///
/// The query methods mirror [`QueryBuilder`] and return a new handle each time; the receiver
/// is never modified. [`Documents::iter`] builds an independent [`DocumentSequence`] per call.
#[derive(Debug)]
pub struct Documents<'a, T: Transport> {
    schema: Schema<'a, T>,
    builder: QueryBuilder,
}

impl<'a, T: Transport> Clone for Documents<'a, T> {
    fn clone(&self) -> Self {
        Self { schema: self.schema.clone(), builder: self.builder.clone() }
    }
}

impl<'a, T: Transport> Documents<'a, T> {
    fn new(schema: Schema<'a, T>, builder: QueryBuilder) -> Self {
        Self { schema, builder }
    }

    fn with_builder(&self, builder: QueryBuilder) -> Self {
        Self::new(self.schema.clone(), builder)
    }

    /// The schema this query runs against.
    pub fn schema(&self) -> &Schema<'a, T> {
        &self.schema
    }

    /// The builder holding this query's descriptor.
    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// See [`QueryBuilder::filter`].
    pub fn filter<K, V>(&self, constraints: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_builder(self.builder.filter(constraints))
    }

    /// See [`QueryBuilder::limit`].
    pub fn limit(&self, limit: i64) -> Self {
        self.with_builder(self.builder.limit(limit))
    }

    /// See [`QueryBuilder::offset`].
    pub fn offset(&self, offset: i64) -> Self {
        self.with_builder(self.builder.offset(offset))
    }

    /// See [`QueryBuilder::batch_size`].
    pub fn batch_size(&self, batch_size: i64) -> Self {
        self.with_builder(self.builder.batch_size(batch_size))
    }

    /// See [`QueryBuilder::order_by`].
    pub fn order_by(&self, field: impl Into<String>, direction: &str) -> MontageResult<Self> {
        Ok(self.with_builder(self.builder.order_by(field, direction)?))
    }

    /// See [`QueryBuilder::order_by_direction`].
    pub fn order_by_direction(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.with_builder(self.builder.order_by_direction(field, direction))
    }

    /// Starts a new pass over the matching documents.
    ///
    /// Nothing is requested until the returned sequence is advanced.
    pub fn iter(&self) -> DocumentSequence<'a, Montage<T>> {
        DocumentSequence::new(
            PageFetcher::new(self.schema.client, self.schema.query_url()),
            self.builder.descriptor().clone(),
        )
    }

    /// Starts a new pass, decoding every document into `D`.
    pub fn typed<D: DeserializeOwned>(&self) -> TypedDocumentSequence<'a, Montage<T>, D> {
        self.iter().typed()
    }

    /// Runs the query to completion and returns every matching document.
    pub async fn try_collect_all(&self) -> MontageResult<Vec<Document>> {
        self.iter().try_collect_all().await
    }
}
