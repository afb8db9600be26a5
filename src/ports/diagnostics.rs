// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic sink trait definition.
//!
//! Label search keeps going when a stored record cannot be decoded. Every record it
//! skips is reported to a `DiagnosticSink` so the event can be logged, counted or
//! asserted on in tests.

use crate::domain::StoreError;

/// A receiver for non-fatal problems found while serving a request.
///
/// # Examples
///
/// ```rust
/// use config_registry::domain::StoreError;
/// use config_registry::ports::DiagnosticSink;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl DiagnosticSink for Counter {
///     fn record_skipped(&self, _key: &str, _error: &StoreError) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
/// ```
pub trait DiagnosticSink: Send + Sync {
    /// Called once for each stored record that search had to skip.
    fn record_skipped(&self, key: &str, error: &StoreError);
}
