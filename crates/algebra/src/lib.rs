// Copyright 2025 Irreducible Inc.

//! The algebraic primitive interface consumed by the expression engine.
//!
//! Concrete structures implement [`GroupLaw`] over a typed value; the engine only ever sees the
//! type-erased [`Structure`] and [`Element`] handles, so expressions may freely mix elements of
//! several groups (source and target groups of a [`Pairing`], for instance).
//!
//! The [`groups`] module ships small reference structures: multiplicative and additive integer
//! groups, a non-commutative matrix group and a symmetric toy pairing. They exist to exercise the
//! engine and make no claim to cryptographic strength.

mod error;
mod group;
pub mod groups;
mod pairing;

pub use error::*;
pub use group::*;
pub use pairing::*;
