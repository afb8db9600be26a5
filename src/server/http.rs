// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport for the registry.
//!
//! Both namespaces expose the same routes:
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | POST | `/configs` | 201 + record |
//! | GET | `/configs/:id/:version` | 200 + record |
//! | PUT | `/configs/:id/:version` | 200 + record |
//! | DELETE | `/configs/:id/:version` | 204 |
//! | GET | `/configs/search?<label>=<value>` | 200 + array |
//!
//! and the same under `/groups`. Failures carry a JSON body `{"error": "..."}`.

use super::limiter::{admission, AdmissionLimiter};
use crate::domain::{
    Configuration, ConfigurationGroup, RegistryError, RegistryService, Result, VersionedRecord,
};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    registry: Arc<dyn RegistryService>,
}

/// A record type served over HTTP, bound to its registry operations.
trait Resource: VersionedRecord + Clone + 'static {
    fn create(registry: &dyn RegistryService, record: Self) -> Result<Self>;
    fn get(registry: &dyn RegistryService, id: &str, version: &str) -> Result<Self>;
    fn update(registry: &dyn RegistryService, record: Self) -> Result<Self>;
    fn delete(registry: &dyn RegistryService, id: &str, version: &str) -> Result<()>;
    fn search(registry: &dyn RegistryService, labels: &HashMap<String, String>)
        -> Result<Vec<Self>>;
}

impl Resource for Configuration {
    fn create(registry: &dyn RegistryService, record: Self) -> Result<Self> {
        registry.create_configuration(record)
    }

    fn get(registry: &dyn RegistryService, id: &str, version: &str) -> Result<Self> {
        registry.get_configuration(id, version)
    }

    fn update(registry: &dyn RegistryService, record: Self) -> Result<Self> {
        registry.update_configuration(record)
    }

    fn delete(registry: &dyn RegistryService, id: &str, version: &str) -> Result<()> {
        registry.delete_configuration(id, version)
    }

    fn search(
        registry: &dyn RegistryService,
        labels: &HashMap<String, String>,
    ) -> Result<Vec<Self>> {
        registry.search_configurations(labels)
    }
}

impl Resource for ConfigurationGroup {
    fn create(registry: &dyn RegistryService, record: Self) -> Result<Self> {
        registry.create_group(record)
    }

    fn get(registry: &dyn RegistryService, id: &str, version: &str) -> Result<Self> {
        registry.get_group(id, version)
    }

    fn update(registry: &dyn RegistryService, record: Self) -> Result<Self> {
        registry.update_group(record)
    }

    fn delete(registry: &dyn RegistryService, id: &str, version: &str) -> Result<()> {
        registry.delete_group(id, version)
    }

    fn search(
        registry: &dyn RegistryService,
        labels: &HashMap<String, String>,
    ) -> Result<Vec<Self>> {
        registry.search_groups(labels)
    }
}

/// Error returned by handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Returns the HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::InvalidInput { .. } | RegistryError::InvalidQuery { .. } => {
                StatusCode::BAD_REQUEST
            }
            RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::AlreadyExists { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "Request rejected");
        }
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Builds the router serving `registry`, gated by `limiter`.
pub fn router(registry: Arc<dyn RegistryService>, limiter: Arc<AdmissionLimiter>) -> Router {
    Router::new()
        .route("/configs", post(create::<Configuration>))
        .route("/configs/search", get(search::<Configuration>))
        .route(
            "/configs/:id/:version",
            get(fetch::<Configuration>)
                .put(update::<Configuration>)
                .delete(delete::<Configuration>),
        )
        .route("/groups", post(create::<ConfigurationGroup>))
        .route("/groups/search", get(search::<ConfigurationGroup>))
        .route(
            "/groups/:id/:version",
            get(fetch::<ConfigurationGroup>)
                .put(update::<ConfigurationGroup>)
                .delete(delete::<ConfigurationGroup>),
        )
        .with_state(AppState { registry })
        .layer(middleware::from_fn_with_state(limiter, admission))
}

/// Runs a registry call on the blocking pool; remote stores block on I/O.
///
/// The call is not cancelled if the client goes away. It runs to completion,
/// bounded by the store's request deadline.
async fn blocking<T, F>(registry: Arc<dyn RegistryService>, call: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce(&dyn RegistryService) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || call(registry.as_ref()))
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Registry task failed: {}", e),
            )
        })?;
    outcome.map_err(ApiError::from)
}

fn decode<R: Resource>(body: &[u8]) -> std::result::Result<R, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError::from(RegistryError::invalid_input(format!(
            "Malformed {} body: {}",
            R::NAMESPACE,
            e
        )))
    })
}

async fn create<R: Resource>(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<(StatusCode, Json<R>), ApiError> {
    let record = decode::<R>(&body)?;
    let created = blocking(state.registry, move |registry| R::create(registry, record)).await?;

    tracing::info!(
        namespace = %R::NAMESPACE,
        id = created.id(),
        version = created.version(),
        "Record created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

async fn fetch<R: Resource>(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> std::result::Result<Json<R>, ApiError> {
    let record = blocking(state.registry, move |registry| R::get(registry, &id, &version)).await?;
    Ok(Json(record))
}

async fn update<R: Resource>(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
    body: Bytes,
) -> std::result::Result<Json<R>, ApiError> {
    let record = decode::<R>(&body)?;

    if record.id() != id || record.version() != version {
        return Err(RegistryError::invalid_input(format!(
            "Body identity '{}/{}' does not match path '{}/{}'",
            record.id(),
            record.version(),
            id,
            version
        ))
        .into());
    }

    let updated = blocking(state.registry, move |registry| R::update(registry, record)).await?;
    Ok(Json(updated))
}

async fn delete<R: Resource>(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> std::result::Result<StatusCode, ApiError> {
    blocking(state.registry, move |registry| R::delete(registry, &id, &version)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search<R: Resource>(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> std::result::Result<Json<Vec<R>>, ApiError> {
    // Repeated label keys keep their first value.
    let mut labels = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        labels.entry(key).or_insert(value);
    }

    let found = blocking(state.registry, move |registry| R::search(registry, &labels)).await?;
    Ok(Json(found))
}
