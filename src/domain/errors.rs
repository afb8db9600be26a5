// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the registry crate.
//!
//! Two layers of errors exist. [`StoreError`] is raised by record store adapters and
//! keeps "missing" distinct from "backend failure". [`RegistryError`] is what the
//! registry service returns to its callers and maps one-to-one onto client errors,
//! conflicts and server errors.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a record store.
///
/// # Examples
///
/// ```
/// use config_registry::domain::errors::StoreError;
///
/// let err = StoreError::NotFound {
///     key: "configs/app/v1".to_string(),
/// };
/// assert!(err.is_not_found());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No entry exists under the key.
    #[error("Record not found: {key}")]
    NotFound {
        /// The key that was not found
        key: String,
    },

    /// An entry already exists under the key and the write required its absence.
    #[error("Record already exists: {key}")]
    Conflict {
        /// The conflicting key
        key: String,
    },

    /// The backend failed to serve the request.
    #[error("Store backend '{backend}' error: {message}")]
    Backend {
        /// The name of the backend that failed
        backend: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend did not answer before the request deadline.
    #[error("Store backend '{backend}' timed out after {after:?}")]
    Timeout {
        /// The name of the backend that timed out
        backend: String,
        /// The deadline that expired
        after: Duration,
    },

    /// A stored value could not be encoded or decoded.
    #[error("Corrupt record under key '{key}': {source}")]
    Corrupt {
        /// The key of the offending record
        key: String,
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Returns `true` if this error reports a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Creates a backend error from any error type.
    pub fn backend<E>(backend: &str, message: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend {
            backend: backend.to_string(),
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }
}

/// Errors returned by registry operations.
///
/// # Examples
///
/// ```
/// use config_registry::domain::errors::RegistryError;
///
/// let err = RegistryError::NotFound {
///     id: "app".to_string(),
///     version: "v1".to_string(),
/// };
/// assert_eq!(err.to_string(), "No record with id 'app' and version 'v1'");
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The caller supplied malformed input.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// The error message
        message: String,
    },

    /// A label search was requested without any label predicate.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// The error message
        message: String,
    },

    /// No record exists with the given identity.
    #[error("No record with id '{id}' and version '{version}'")]
    NotFound {
        /// The requested id
        id: String,
        /// The requested version
        version: String,
    },

    /// A record with the given identity already exists.
    #[error("A record with id '{id}' and version '{version}' already exists")]
    AlreadyExists {
        /// The conflicting id
        id: String,
        /// The conflicting version
        version: String,
    },

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        RegistryError::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns `true` if the error was caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RegistryError::Store(_))
    }
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// A specialized Result type for record store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
