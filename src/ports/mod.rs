// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the trait definitions (ports) that storage backends and
//! diagnostic sinks implement. The registry service depends only on these traits;
//! concrete implementations live in the adapters layer.

pub mod diagnostics;
pub mod store;

// Re-export commonly used types
pub use diagnostics::DiagnosticSink;
pub use store::{RecordStore, StoredEntry};
