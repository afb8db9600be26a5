// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for integration tests: Docker checks and the contract suites
//! every record store and registry must pass.

#![allow(dead_code)]

pub mod contract;

use std::sync::OnceLock;

/// Cached result of Docker availability check.
static DOCKER_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Checks if Docker is available on the system.
///
/// This check is cached after the first call.
pub fn is_docker_available() -> bool {
    *DOCKER_AVAILABLE.get_or_init(|| {
        std::process::Command::new("docker")
            .args(["ps"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    })
}

/// Prints a warning message that a test is skipped due to Docker being unavailable.
pub fn print_docker_unavailable_warning(test_name: &str) {
    eprintln!("\n⚠️  SKIPPED: {} - Docker is not available", test_name);
    eprintln!("   To run this test, ensure Docker is installed and running.");
    eprintln!("   Installation: https://docs.docker.com/get-docker/\n");
}

/// Returns a key prefix no other test run shares.
pub fn unique_prefix(base: &str) -> String {
    format!("{}-{}/", base, uuid::Uuid::new_v4().simple())
}
