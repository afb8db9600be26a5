// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared runtime used by the remote store adapters.
//!
//! The `RecordStore` port is synchronous while the etcd and Redis clients are
//! async. Remote adapters create their clients on this runtime and drive every
//! request on it, bounded by a per-request deadline.

use crate::domain::{StoreError, StoreResult};
use once_cell::sync::Lazy;
use std::future::Future;
use std::sync::mpsc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Default deadline applied to each remote round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared runtime for remote store I/O, created on first use.
static STORE_RUNTIME: Lazy<std::io::Result<Runtime>> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("registry-store-io")
        .enable_all()
        .build()
});

/// Runs `future` to completion on the shared store runtime.
///
/// The future is spawned onto the store runtime and the calling thread parks on
/// a channel until it finishes or `deadline` passes, in which case the result
/// is `StoreError::Timeout`. Waiting on a channel rather than entering the
/// runtime means the same path serves plain threads, `spawn_blocking` threads
/// and async workers of another runtime without starting a helper thread.
pub(crate) fn block_on<F, T>(backend: &'static str, deadline: Duration, future: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let runtime = STORE_RUNTIME.as_ref().map_err(|e| StoreError::Backend {
        backend: backend.to_string(),
        message: format!("Failed to create store runtime: {}", e),
        source: None,
    })?;

    let (reply_tx, reply_rx) = mpsc::sync_channel(1);
    runtime.spawn(async move {
        let result = match tokio::time::timeout(deadline, future).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                backend: backend.to_string(),
                after: deadline,
            }),
        };
        let _ = reply_tx.send(result);
    });

    // The sender is only dropped unsent if the task panicked.
    reply_rx.recv().unwrap_or_else(|_| {
        Err(StoreError::Backend {
            backend: backend.to_string(),
            message: "Store task panicked".to_string(),
            source: None,
        })
    })
}
