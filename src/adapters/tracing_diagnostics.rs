// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic sink that reports through `tracing`.

use crate::domain::StoreError;
use crate::ports::DiagnosticSink;

/// The default diagnostic sink; emits one `warn` event per skipped record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    /// Creates a new sink.
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticSink for TracingDiagnostics {
    fn record_skipped(&self, key: &str, error: &StoreError) {
        tracing::warn!(key = %key, error = %error, "Skipping undecodable record during search");
    }
}
