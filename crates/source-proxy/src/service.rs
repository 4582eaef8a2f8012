//! HTTP service and builder
//!
//! [`ProxyService`] exposes the proxy as an [`axum::Router`]:
//!
//! | Route | Operation |
//! |---|---|
//! | `PUT /export/{prefix}/{filename}` | store the request body, reply with the new filename as text |
//! | `GET /get/{prefix}/{filename}` | stream the object |
//! | `GET /next/{prefix}` | first filename under `prefix`, as JSON |
//! | `GET /next/{prefix}/{filename}` | filename following `filename`, as JSON |
//! | `GET /metrics` | operation counters, unauthenticated |
//!
//! Every object route requires an API key in the `apikey` header (or the
//! `apikey` query parameter) whose groups are allowed the request. Errors
//! are JSON `{"code": ..., "message": ...}` with status `401` for
//! `Forbidden` and `400` otherwise.
//!
//! # Example
//!
//! ```
//! use source_proxy::access::SimplePermissions;
//! use source_proxy::auth::SimpleKeyResolver;
//! use source_proxy::service::ProxyServiceBuilder;
//! use source_proxy::source::MemorySource;
//!
//! let mut permissions = SimplePermissions::new();
//! permissions.allow("tenant-a/*", "readers", ["GET"]);
//!
//! let mut builder = ProxyServiceBuilder::new(MemorySource::new());
//! builder.set_key_resolver(SimpleKeyResolver::from_single("key-0001", ["readers"]));
//! builder.set_permissions(permissions);
//! let service = builder.build().unwrap();
//!
//! let router: axum::Router = service.router();
//! ```

use crate::access::{Authorizer, PermissionEvaluator, SimplePermissions};
use crate::auth::{KeyResolver, SimpleKeyResolver};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::metrics::{Counters, ProxyMetrics};
use crate::proxy::Proxy;
use crate::resource::ResourceId;
use crate::sequence::{FilenameSequence, SequenceError};
use crate::source::Source;

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::{HeaderMap, StatusCode, header};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use tokio_util::task::AbortOnDropHandle;
use tracing::{Instrument, debug, debug_span, error};

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "apikey";

const FETCH_BUFFER_SIZE: usize = 64 * 1024;

/// Builder for [`ProxyService`].
///
/// Only the source is required. Without a key resolver and permissions
/// every object request is forbidden; without metrics an in-memory
/// [`Counters`] is used.
pub struct ProxyServiceBuilder {
    source: Box<dyn Source>,
    config: ProxyConfig,
    keys: Option<Box<dyn KeyResolver>>,
    permissions: Option<Box<dyn PermissionEvaluator>>,
    metrics: Option<Arc<dyn ProxyMetrics>>,
}

impl ProxyServiceBuilder {
    #[must_use]
    pub fn new(source: impl Source) -> Self {
        Self {
            source: Box::new(source),
            config: ProxyConfig::default(),
            keys: None,
            permissions: None,
            metrics: None,
        }
    }

    pub fn set_config(&mut self, config: ProxyConfig) {
        self.config = config;
    }

    pub fn set_key_resolver(&mut self, keys: impl KeyResolver) {
        self.keys = Some(Box::new(keys));
    }

    pub fn set_permissions(&mut self, permissions: impl PermissionEvaluator) {
        self.permissions = Some(Box::new(permissions));
    }

    pub fn set_metrics(&mut self, metrics: Arc<dyn ProxyMetrics>) {
        self.metrics = Some(metrics);
    }

    /// Compiles the configured match expression and builds the service.
    ///
    /// # Errors
    /// Returns [`SequenceError`] if the match expression is invalid.
    pub fn build(self) -> Result<ProxyService, SequenceError> {
        let sequence = FilenameSequence::from_config(&self.config)?;
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(Counters::new()));
        let keys = self.keys.unwrap_or_else(|| Box::new(SimpleKeyResolver::new()));
        let permissions = self.permissions.unwrap_or_else(|| Box::new(SimplePermissions::new()));

        Ok(ProxyService {
            inner: Arc::new(Inner {
                proxy: Proxy::from_parts(self.source, sequence, metrics),
                authorizer: Authorizer::from_parts(keys, permissions),
            }),
        })
    }
}

/// The proxy's HTTP surface.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct ProxyService {
    inner: Arc<Inner>,
}

struct Inner {
    proxy: Proxy,
    authorizer: Authorizer,
}

impl ProxyService {
    #[must_use]
    pub fn proxy(&self) -> &Proxy {
        &self.inner.proxy
    }

    #[must_use]
    pub fn authorizer(&self) -> &Authorizer {
        &self.inner.authorizer
    }

    #[must_use]
    pub fn router(&self) -> Router {
        // Layered rather than route-layered so a method without a handler is
        // still authorized before it is rejected.
        let objects = Router::new()
            .route("/export/{prefix}/{filename}", put(export))
            .route("/get/{prefix}/{filename}", get(fetch))
            .route("/next/{prefix}", get(fetch_next))
            .route("/next/{prefix}/{filename}", get(fetch_next))
            .layer(middleware::from_fn_with_state(Arc::clone(&self.inner), check_permissions));

        Router::new()
            .merge(objects)
            .route("/metrics", get(metrics))
            .layer(middleware::from_fn(log_request))
            .with_state(Arc::clone(&self.inner))
    }
}

impl fmt::Debug for ProxyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyService").finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ObjectPath {
    prefix: String,
    #[serde(default)]
    filename: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiKeyQuery {
    apikey: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code().as_str(),
            message: self.message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

fn invalid_path(rejection: PathRejection) -> ProxyError {
    proxy_error!(rejection, InvalidAddress, "invalid object path: {}", rejection.body_text())
}

fn extract_api_key(headers: &HeaderMap, query: ApiKeyQuery) -> String {
    let header = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    match header {
        Some(v) => v.to_owned(),
        None => query.apikey.unwrap_or_default(),
    }
}

async fn check_permissions(
    State(inner): State<Arc<Inner>>,
    path: Result<Path<ObjectPath>, PathRejection>,
    query: Result<Query<ApiKeyQuery>, QueryRejection>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = match path {
        Ok(Path(path)) => path,
        Err(rejection) => return invalid_path(rejection).into_response(),
    };
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let api_key = extract_api_key(req.headers(), query);

    let authorized = inner
        .authorizer
        .authorize(&api_key, req.method(), &path.prefix, &path.filename)
        .await;

    match authorized {
        Ok(resource) => {
            req.extensions_mut().insert(resource);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let t0 = Instant::now();
    let resp = next.run(req).await;
    let duration = t0.elapsed();

    let status = resp.status();
    if status.is_server_error() {
        error!(%method, %path, %status, ?duration);
    } else {
        debug!(%method, %path, %status, ?duration);
    }
    resp
}

async fn export(
    State(inner): State<Arc<Inner>>,
    Extension(resource): Extension<ResourceId>,
    path: Result<Path<ObjectPath>, PathRejection>,
    body: Body,
) -> ProxyResult<String> {
    let Path(path) = path.map_err(invalid_path)?;
    inner
        .proxy
        .store(&path.prefix, &path.filename, body.into_data_stream())
        .instrument(debug_span!("export", %resource))
        .await
}

async fn fetch(
    State(inner): State<Arc<Inner>>,
    Extension(resource): Extension<ResourceId>,
    path: Result<Path<ObjectPath>, PathRejection>,
) -> ProxyResult<Response> {
    let Path(path) = path.map_err(invalid_path)?;
    let (mut writer, mut reader) = tokio::io::duplex(FETCH_BUFFER_SIZE);

    // The handle travels with the response body; dropping either one aborts
    // the backend call.
    let span = debug_span!("get", %resource);
    let task = AbortOnDropHandle::new(tokio::spawn(
        async move { inner.proxy.fetch(&path.prefix, &path.filename, &mut writer).await }.instrument(span),
    ));

    // Wait for the first bytes so a failure before any output still gets a
    // proper error response.
    let mut head = BytesMut::with_capacity(FETCH_BUFFER_SIZE);
    let n = reader
        .read_buf(&mut head)
        .await
        .map_err(|e| proxy_error!(e, StorageReadFailed, "error getting {resource}"))?;

    if n == 0 {
        join_fetch(task).await?;
        return Ok(octet_stream(Body::empty()));
    }

    // A failure after the first bytes can only abort the body.
    let tail = futures::stream::once(join_fetch(task)).filter_map(|result| {
        let item = result.err().map(|e| Err::<Bytes, _>(io::Error::other(e)));
        futures::future::ready(item)
    });
    let stream = futures::stream::iter([Ok(head.freeze())])
        .chain(ReaderStream::new(reader))
        .chain(tail);

    Ok(octet_stream(Body::from_stream(stream)))
}

async fn join_fetch(task: AbortOnDropHandle<ProxyResult>) -> ProxyResult {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(proxy_error!(e, StorageReadFailed, "fetch task failed")),
    }
}

fn octet_stream(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response()
}

async fn fetch_next(
    State(inner): State<Arc<Inner>>,
    Extension(resource): Extension<ResourceId>,
    path: Result<Path<ObjectPath>, PathRejection>,
) -> ProxyResult<Json<String>> {
    let Path(path) = path.map_err(invalid_path)?;
    inner
        .proxy
        .fetch_next(&path.prefix, &path.filename)
        .instrument(debug_span!("get_next", %resource))
        .await
        .map(Json)
}

async fn metrics(State(inner): State<Arc<Inner>>) -> Response {
    match inner.proxy.metrics().render() {
        Some(text) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
