// Copyright 2025 Irreducible Inc.

//! Multi-exponentiation: computing `∏ base_i^exponent_i` in a single pass.
//!
//! A [`MultiExpContext`] collects the terms of one product over one structure. [`multiexp`]
//! picks an [`MultiExpAlgorithm`] according to a [`MultiExpConfig`] and evaluates the context,
//! consulting and populating a [`PrecomputationCache`] for windowed variants.

mod algorithms;
mod cache;
mod config;
mod context;
pub mod digits;
mod error;
mod snapshot;

pub use algorithms::*;
pub use cache::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use snapshot::*;
