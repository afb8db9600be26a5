// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer containing the registry service implementation.
//!
//! This module contains the concrete implementation of the `RegistryService` trait,
//! which maps registry operations onto a record store.

pub mod default_registry;

// Re-export commonly used types
pub use default_registry::{DefaultRegistry, RegistryBuilder};
