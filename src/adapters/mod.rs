// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing record store and diagnostic implementations.
//!
//! This module contains concrete implementations of the traits defined in the
//! ports layer. The in-memory store is always available; remote stores are
//! enabled by feature flags.

#[cfg(feature = "etcd")]
pub mod etcd;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
#[cfg(any(feature = "etcd", feature = "redis"))]
pub(crate) mod runtime;
pub mod tracing_diagnostics;

// Re-export adapters based on feature flags
#[cfg(feature = "etcd")]
pub use etcd::EtcdStore;
pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
pub use tracing_diagnostics::TracingDiagnostics;
