// Copyright 2024-2025 Irreducible Inc.

//! Small helpers shared by the algebrix crates: error macros, environment flags, thread pool
//! setup, tracing initialisation and byte serialization.

pub mod env;
pub mod error_utils;
pub mod rayon;
pub mod serialization;
pub mod tracing;

pub use serialization::{DeserializeBytes, Error as SerializationError, SerializeBytes};
