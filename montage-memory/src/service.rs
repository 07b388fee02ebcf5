//! In-memory implementation of the Montage service.
//!
//! [`InMemoryService`] answers the same versioned paths as the hosted API and produces the
//! same response envelopes, so a client can run against it unchanged. Documents live in
//! insertion order per schema behind an async-aware read-write lock.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::{Map, Value, json};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

use montage_core::{
    error::{MontageError, MontageResult},
    page::{Document, Page},
    query::Descriptor,
    transport::{Method, RequestArgs, Transport, TransportBuilder},
};

use crate::evaluator;

/// A request received by an [`InMemoryService`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// HTTP method of the request.
    pub method: Method,
    /// Versioned path, e.g. `api/v1/schemas/movies/query/`.
    pub path: String,
    /// Arguments as sent by the client.
    pub args: RequestArgs,
}

#[derive(Debug, Clone)]
struct Account {
    username: String,
    password: String,
    token: String,
}

#[derive(Debug)]
struct OpenCursor {
    schema: String,
    remaining: VecDeque<Document>,
    batch_size: usize,
}

#[derive(Debug, Default)]
struct ServiceState {
    schemas: BTreeMap<String, Vec<Document>>,
    cursors: HashMap<String, OpenCursor>,
    accounts: Vec<Account>,
    files: BTreeMap<String, Value>,
    requests: Vec<RecordedRequest>,
    failures: HashMap<usize, MontageError>,
}

/// Thread-safe in-memory stand-in for the Montage service.
///
/// Implements [`Transport`], so it can be handed directly to
/// [`Montage::new`](montage_core::client::Montage::new). Clones share the same state.
///
/// # Behaviour
///
/// - `auth/` accepts registered username/password pairs and returns their token
/// - `schemas/{schema}/query/` evaluates equality filters, ordering, offset and limit,
///   then pages the result by `batch_size` with opaque cursor tokens
/// - `schemas/{schema}/save/` assigns a UUID `id` to documents that have none
/// - Unknown schemas, documents and files answer with status 404
///
/// Every request is recorded and can be inspected with [`InMemoryService::requests`].
///
/// # Example
///
/// ```ignore
/// use montage_memory::InMemoryService;
/// use montage_core::transport::TransportBuilder;
///
/// let service = InMemoryService::builder()
///     .with_user("user@example.com", "secret")
///     .with_schema("movies")
///     .build()
///     .await?;
///
/// let client = Montage::new(service.clone(), ClientConfig::new("higley"));
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryService {
    state: Arc<RwLock<ServiceState>>,
    require_auth: bool,
}

impl InMemoryService {
    /// Creates an empty service that does not require authentication.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for a pre-populated service.
    pub fn builder() -> InMemoryServiceBuilder {
        InMemoryServiceBuilder::default()
    }

    /// Creates the schema `name` if it does not exist yet.
    pub async fn create_schema(&self, name: &str) {
        self.state
            .write()
            .await
            .schemas
            .entry(name.to_string())
            .or_default();
    }

    /// Stores `documents` in `schema`, creating the schema when needed, and returns them
    /// with their ids.
    pub async fn insert_documents(&self, schema: &str, documents: Vec<Document>) -> Vec<Document> {
        let mut state = self.state.write().await;

        upsert(state.schemas.entry(schema.to_string()).or_default(), documents)
    }

    /// Returns every document of `schema` in stored order.
    pub async fn documents(&self, schema: &str) -> Vec<Document> {
        self.state
            .read()
            .await
            .schemas
            .get(schema)
            .cloned()
            .unwrap_or_default()
    }

    /// Registers an account and returns its token.
    pub async fn add_user(&self, username: &str, password: &str) -> String {
        let token = Uuid::new_v4().to_string();

        self.state.write().await.accounts.push(Account {
            username: username.to_string(),
            password: password.to_string(),
            token: token.clone(),
        });

        token
    }

    /// Stores the metadata of a file under `id`.
    pub async fn insert_file(&self, id: &str, metadata: Document) {
        self.state
            .write()
            .await
            .files
            .insert(id.to_string(), file_entry(id, metadata));
    }

    /// Makes the `nth` request from now fail with `error`; `1` is the next request.
    ///
    /// The failing request is still recorded.
    pub async fn fail_request(&self, nth: usize, error: MontageError) {
        let mut state = self.state.write().await;
        let number = state.requests.len() + nth.max(1);

        state.failures.insert(number, error);
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().await.requests.clone()
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    /// Number of cursors issued and not yet consumed.
    pub async fn open_cursors(&self) -> usize {
        self.state.read().await.cursors.len()
    }
}

#[async_trait]
impl Transport for InMemoryService {
    async fn request(&self, method: Method, path: &str, args: RequestArgs) -> MontageResult<Value> {
        debug!(%method, path, "in-memory request");

        let mut state = self.state.write().await;
        state.requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            args: args.clone(),
        });

        let number = state.requests.len();
        if let Some(error) = state.failures.remove(&number) {
            return Err(error);
        }

        let route = Route::parse(path)?;
        if self.require_auth && route != Route::Auth {
            state.authenticate(&args)?;
        }

        state.handle(method, route, &args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'p> {
    Auth,
    User,
    SchemaList,
    SchemaDetail(&'p str),
    DocumentQuery(&'p str),
    DocumentSave(&'p str),
    DocumentDetail(&'p str, &'p str),
    FileList,
    FileDetail(&'p str),
}

impl<'p> Route<'p> {
    /// Parses `api/v{n}/...` paths. Any API version is accepted.
    fn parse(path: &'p str) -> MontageResult<Self> {
        let rest = path
            .trim_start_matches('/')
            .strip_prefix("api/v")
            .and_then(|rest| rest.split_once('/'))
            .filter(|(version, _)| !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()))
            .map(|(_, rest)| rest)
            .ok_or_else(|| not_found(path))?;

        let segments = rest.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();

        Ok(match segments.as_slice() {
            ["auth"] => Route::Auth,
            ["auth", "user"] => Route::User,
            ["schemas"] => Route::SchemaList,
            ["schemas", schema] => Route::SchemaDetail(*schema),
            ["schemas", schema, "query"] => Route::DocumentQuery(*schema),
            ["schemas", schema, "save"] => Route::DocumentSave(*schema),
            ["schemas", schema, id] => Route::DocumentDetail(*schema, *id),
            ["files"] => Route::FileList,
            ["files", id] => Route::FileDetail(*id),
            _ => return Err(not_found(path)),
        })
    }
}

impl ServiceState {
    fn handle(&mut self, method: Method, route: Route<'_>, args: &RequestArgs) -> MontageResult<Value> {
        match (method, route) {
            (Method::Post, Route::Auth) => self.login(args),
            (Method::Get, Route::User) => {
                let account = self.authenticate(args)?;

                Ok(envelope(json!({ "username": account.username })))
            }
            (Method::Get, Route::SchemaList) => Ok(envelope(
                self.schemas
                    .keys()
                    .map(|name| json!({ "name": name }))
                    .collect(),
            )),
            (Method::Get, Route::SchemaDetail(schema)) => {
                let documents = self.schema(schema)?;

                Ok(envelope(json!({ "name": schema, "count": documents.len() })))
            }
            (Method::Get, Route::DocumentQuery(schema)) => self.query(schema, args),
            (Method::Post, Route::DocumentSave(schema)) => self.save(schema, args),
            (Method::Get, Route::DocumentDetail(schema, id)) => self
                .schema(schema)?
                .iter()
                .find(|document| document_id(document) == Some(id))
                .map(|document| envelope(Value::Object(document.clone())))
                .ok_or_else(|| not_found(id)),
            (Method::Post, Route::DocumentDetail(schema, id)) => self.update(schema, id, args),
            (Method::Delete, Route::DocumentDetail(schema, id)) => {
                let documents = self.schema_mut(schema)?;
                let position = documents
                    .iter()
                    .position(|document| document_id(document) == Some(id))
                    .ok_or_else(|| not_found(id))?;
                documents.remove(position);

                Ok(Value::Null)
            }
            (Method::Get, Route::FileList) => Ok(envelope(self.files.values().cloned().collect())),
            (Method::Get, Route::FileDetail(id)) => self
                .files
                .get(id)
                .cloned()
                .map(envelope)
                .ok_or_else(|| not_found(id)),
            (Method::Delete, Route::FileDetail(id)) => self
                .files
                .remove(id)
                .map(|_| Value::Null)
                .ok_or_else(|| not_found(id)),
            (method, route) => Err(MontageError::service(
                Some(405),
                format!("{method} is not allowed on {route:?}"),
            )),
        }
    }

    fn schema(&self, name: &str) -> MontageResult<&Vec<Document>> {
        self.schemas.get(name).ok_or_else(|| not_found(name))
    }

    fn schema_mut(&mut self, name: &str) -> MontageResult<&mut Vec<Document>> {
        self.schemas.get_mut(name).ok_or_else(|| not_found(name))
    }

    fn login(&self, args: &RequestArgs) -> MontageResult<Value> {
        let (username, password) = (args.form.get("username"), args.form.get("password"));

        self.accounts
            .iter()
            .find(|account| {
                Some(&account.username) == username && Some(&account.password) == password
            })
            .map(|account| envelope(json!({ "token": account.token })))
            .ok_or_else(|| MontageError::service(Some(400), "Invalid credentials"))
    }

    fn authenticate(&self, args: &RequestArgs) -> MontageResult<&Account> {
        args.headers
            .get("Authorization")
            .and_then(|value| value.strip_prefix("Token "))
            .and_then(|token| self.accounts.iter().find(|account| account.token == token))
            .ok_or_else(|| MontageError::service(Some(401), "Invalid token"))
    }

    fn query(&mut self, schema: &str, args: &RequestArgs) -> MontageResult<Value> {
        let (mut remaining, batch_size) = match (args.query_param("cursor"), args.query_param("query")) {
            (Some(token), _) => {
                let cursor = self
                    .cursors
                    .remove(token)
                    .filter(|cursor| cursor.schema == schema)
                    .ok_or_else(|| bad_request(format!("Invalid cursor {token}")))?;

                (cursor.remaining, cursor.batch_size)
            }
            (None, Some(query)) => {
                let descriptor = serde_json::from_str::<Map<String, Value>>(query)
                    .map_err(|e| bad_request(format!("Invalid query: {e}")))
                    .and_then(|overrides| {
                        Descriptor::from_overrides(overrides)
                            .map_err(|e| bad_request(format!("Invalid query: {e}")))
                    })?;
                let batch_size = usize::try_from(descriptor.batch_size)
                    .ok()
                    .filter(|size| *size > 0)
                    .ok_or_else(|| bad_request("batch_size must be positive"))?;

                (evaluator::evaluate(self.schema(schema)?, &descriptor).into(), batch_size)
            }
            (None, None) => return Err(bad_request("A query or a cursor is required")),
        };

        let data = remaining
            .drain(..batch_size.min(remaining.len()))
            .collect::<Vec<_>>();

        let cursor = if remaining.is_empty() {
            None
        } else {
            let token = Uuid::new_v4().to_string();
            self.cursors.insert(
                token.clone(),
                OpenCursor { schema: schema.to_string(), remaining, batch_size },
            );

            Some(token)
        };

        Ok(serde_json::to_value(Page::builder(data).with_cursor(cursor).build())?)
    }

    fn save(&mut self, schema: &str, args: &RequestArgs) -> MontageResult<Value> {
        let documents = match parse_body(args)? {
            Value::Array(items) => items,
            single => vec![single],
        }
        .into_iter()
        .map(|item| match item {
            Value::Object(document) => Ok(document),
            _ => Err(bad_request("Documents must be JSON objects")),
        })
        .collect::<MontageResult<Vec<_>>>()?;

        let saved = upsert(self.schema_mut(schema)?, documents);

        Ok(envelope(saved.into_iter().map(Value::Object).collect()))
    }

    fn update(&mut self, schema: &str, id: &str, args: &RequestArgs) -> MontageResult<Value> {
        let Value::Object(mut document) = parse_body(args)? else {
            return Err(bad_request("Document must be a JSON object"));
        };
        document.insert("id".to_string(), Value::String(id.to_string()));

        let existing = self
            .schema_mut(schema)?
            .iter_mut()
            .find(|stored| document_id(stored) == Some(id))
            .ok_or_else(|| not_found(id))?;
        *existing = document.clone();

        Ok(envelope(Value::Object(document)))
    }
}

/// Inserts or replaces `documents` by id, assigning ids where missing.
fn upsert(stored: &mut Vec<Document>, documents: Vec<Document>) -> Vec<Document> {
    documents
        .into_iter()
        .map(|mut document| {
            let id = match document_id(&document) {
                Some(id) => id.to_string(),
                None => {
                    let id = Uuid::new_v4().to_string();
                    document.insert("id".to_string(), Value::String(id.clone()));
                    id
                }
            };

            match stored.iter_mut().find(|existing| document_id(existing) == Some(id.as_str())) {
                Some(existing) => *existing = document.clone(),
                None => stored.push(document.clone()),
            }

            document
        })
        .collect()
}

fn document_id(document: &Document) -> Option<&str> {
    document.get("id").and_then(Value::as_str)
}

fn file_entry(id: &str, mut metadata: Document) -> Value {
    metadata.insert("id".to_string(), Value::String(id.to_string()));
    Value::Object(metadata)
}

fn parse_body(args: &RequestArgs) -> MontageResult<Value> {
    let body = args
        .body
        .as_deref()
        .ok_or_else(|| bad_request("A request body is required"))?;

    serde_json::from_str(body).map_err(|e| bad_request(format!("Invalid body: {e}")))
}

fn envelope(data: Value) -> Value {
    json!({ "data": data })
}

fn not_found(what: &str) -> MontageError {
    MontageError::service(Some(404), format!("Not found: {what}"))
}

fn bad_request(message: impl Into<String>) -> MontageError {
    MontageError::service(Some(400), message)
}

/// Builder for a pre-populated [`InMemoryService`].
#[derive(Debug, Default)]
pub struct InMemoryServiceBuilder {
    schemas: BTreeMap<String, Vec<Document>>,
    accounts: Vec<Account>,
    files: BTreeMap<String, Value>,
    require_auth: bool,
}

impl InMemoryServiceBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty schema.
    pub fn with_schema(mut self, name: impl Into<String>) -> Self {
        self.schemas.entry(name.into()).or_default();
        self
    }

    /// Adds documents to a schema, creating it when needed.
    pub fn with_documents(mut self, schema: impl Into<String>, documents: Vec<Document>) -> Self {
        upsert(self.schemas.entry(schema.into()).or_default(), documents);
        self
    }

    /// Registers an account with a generated token.
    pub fn with_user(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_user_token(username, password, Uuid::new_v4().to_string())
    }

    /// Registers an account with a known token.
    pub fn with_user_token(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.accounts.push(Account {
            username: username.into(),
            password: password.into(),
            token: token.into(),
        });
        self
    }

    /// Adds file metadata under `id`.
    pub fn with_file(mut self, id: impl Into<String>, metadata: Document) -> Self {
        let id = id.into();
        let entry = file_entry(&id, metadata);

        self.files.insert(id, entry);
        self
    }

    /// Rejects every request except `auth/` that lacks a valid `Authorization` header.
    pub fn require_auth(mut self) -> Self {
        self.require_auth = true;
        self
    }
}

#[async_trait]
impl TransportBuilder for InMemoryServiceBuilder {
    type Transport = InMemoryService;

    async fn build(self) -> MontageResult<Self::Transport> {
        let state = ServiceState {
            schemas: self.schemas,
            accounts: self.accounts,
            files: self.files,
            ..ServiceState::default()
        };

        Ok(InMemoryService {
            state: Arc::new(RwLock::new(state)),
            require_auth: self.require_auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_core::query::QueryBuilder;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn query_args(builder: &QueryBuilder) -> RequestArgs {
        RequestArgs::new().with_query("query", builder.descriptor().to_query_string().unwrap())
    }

    async fn seeded(count: usize) -> InMemoryService {
        InMemoryService::builder()
            .with_documents(
                "movies",
                (0..count).map(|n| doc(json!({ "id": format!("m{n}"), "rank": n }))).collect(),
            )
            .build()
            .await
            .unwrap()
    }

    #[test]
    fn parses_versioned_routes() {
        assert_eq!(Route::parse("api/v1/auth/").unwrap(), Route::Auth);
        assert_eq!(Route::parse("api/v2/auth/user/").unwrap(), Route::User);
        assert_eq!(
            Route::parse("api/v1/schemas/movies/query/").unwrap(),
            Route::DocumentQuery("movies")
        );
        assert_eq!(
            Route::parse("/api/v1/schemas/movies/42/").unwrap(),
            Route::DocumentDetail("movies", "42")
        );
        assert_eq!(Route::parse("api/v1/files/f-1/").unwrap(), Route::FileDetail("f-1"));

        for path in ["api/1/auth/", "api/vx/auth/", "api/v1/nothing/", "schemas/movies/"] {
            assert_eq!(Route::parse(path).unwrap_err().status(), Some(404), "path {path}");
        }
    }

    #[tokio::test]
    async fn pages_results_by_batch_size() {
        let service = seeded(5).await;
        let path = "api/v1/schemas/movies/query/";

        let first = service
            .request(Method::Get, path, query_args(&QueryBuilder::new().batch_size(2)))
            .await
            .unwrap();
        let first: Page = serde_json::from_value(first).unwrap();
        assert_eq!(first.data.len(), 2);
        let token = first.cursor.unwrap();

        let second: Page = serde_json::from_value(
            service
                .request(Method::Get, path, RequestArgs::new().with_query("cursor", token.clone()))
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(second.data[0]["id"], json!("m2"));

        let third: Page = serde_json::from_value(
            service
                .request(Method::Get, path, RequestArgs::new().with_query("cursor", second.cursor.unwrap()))
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(third.data.len(), 1);
        assert_eq!(third.cursor, None);
        assert_eq!(service.open_cursors().await, 0);

        let reused = service
            .request(Method::Get, path, RequestArgs::new().with_query("cursor", token))
            .await;
        assert_eq!(reused.unwrap_err().status(), Some(400));
    }

    #[tokio::test]
    async fn query_requires_a_positive_batch_size() {
        let service = seeded(1).await;

        let result = service
            .request(
                Method::Get,
                "api/v1/schemas/movies/query/",
                query_args(&QueryBuilder::new().batch_size(0)),
            )
            .await;

        assert_eq!(result.unwrap_err().status(), Some(400));
    }

    #[tokio::test]
    async fn save_assigns_ids_and_replaces_existing() {
        let service = seeded(1).await;

        let body = json!([{ "title": "new" }, { "id": "m0", "rank": 10 }]).to_string();
        let saved = service
            .request(Method::Post, "api/v1/schemas/movies/save/", RequestArgs::new().with_body(body))
            .await
            .unwrap();

        let saved = saved["data"].as_array().unwrap();
        assert!(saved[0]["id"].as_str().is_some());
        assert_eq!(saved[1], json!({ "id": "m0", "rank": 10 }));

        let stored = service.documents("movies").await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["rank"], json!(10));
    }

    #[tokio::test]
    async fn unknown_schema_and_document_are_not_found() {
        let service = seeded(1).await;

        let missing_schema = service
            .request(Method::Get, "api/v1/schemas/books/query/", query_args(&QueryBuilder::new()))
            .await;
        assert_eq!(missing_schema.unwrap_err().status(), Some(404));

        let missing_document = service
            .request(Method::Delete, "api/v1/schemas/movies/nope/", RequestArgs::new())
            .await;
        assert_eq!(missing_document.unwrap_err().status(), Some(404));

        let wrong_method = service
            .request(Method::Delete, "api/v1/schemas/", RequestArgs::new())
            .await;
        assert_eq!(wrong_method.unwrap_err().status(), Some(405));
    }

    #[tokio::test]
    async fn login_and_required_auth() {
        let service = InMemoryService::builder()
            .with_user_token("user", "secret", "tok")
            .with_schema("movies")
            .require_auth()
            .build()
            .await
            .unwrap();

        let denied = service
            .request(Method::Get, "api/v1/schemas/", RequestArgs::new())
            .await;
        assert_eq!(denied.unwrap_err().status(), Some(401));

        let login = service
            .request(
                Method::Post,
                "api/v1/auth/",
                RequestArgs::new().with_form("username", "user").with_form("password", "secret"),
            )
            .await
            .unwrap();
        assert_eq!(login, json!({ "data": { "token": "tok" } }));

        let listed = service
            .request(
                Method::Get,
                "api/v1/schemas/",
                RequestArgs::new().with_header("Authorization", "Token tok"),
            )
            .await
            .unwrap();
        assert_eq!(listed, json!({ "data": [{ "name": "movies" }] }));
    }

    #[tokio::test]
    async fn injected_failure_hits_the_chosen_request() {
        let service = seeded(1).await;
        service
            .fail_request(2, MontageError::service(Some(503), "unavailable"))
            .await;

        let path = "api/v1/schemas/movies/";
        assert!(service.request(Method::Get, path, RequestArgs::new()).await.is_ok());
        assert_eq!(
            service.request(Method::Get, path, RequestArgs::new()).await.unwrap_err().status(),
            Some(503)
        );
        assert!(service.request(Method::Get, path, RequestArgs::new()).await.is_ok());
        assert_eq!(service.request_count().await, 3);
    }

    #[tokio::test]
    async fn files_can_be_listed_fetched_and_deleted() {
        let service = InMemoryService::new();
        service.insert_file("f-1", doc(json!({ "name": "poster.png" }))).await;

        let detail = service
            .request(Method::Get, "api/v1/files/f-1/", RequestArgs::new())
            .await
            .unwrap();
        assert_eq!(detail, json!({ "data": { "id": "f-1", "name": "poster.png" } }));

        service
            .request(Method::Delete, "api/v1/files/f-1/", RequestArgs::new())
            .await
            .unwrap();
        let listed = service
            .request(Method::Get, "api/v1/files/", RequestArgs::new())
            .await
            .unwrap();
        assert_eq!(listed, json!({ "data": [] }));
    }
}
