// Copyright 2025 Irreducible Inc.

//! Expressions over groups and their efficient evaluation.
//!
//! Protocol code describes computations as trees of [`ExponentExpr`], [`GroupElementExpr`] and
//! [`BooleanExpr`] nodes with named variables. An [`Evaluator`] rewrites such a tree with the
//! rules of [`rewrite`], binds the variables, and flattens every product over a commutative
//! structure into a single multi-exponentiation, evaluating pairing arguments concurrently.
//! [`LazyElement`] records chains of group operations and evaluates them the same way on demand.
//!
//! Every expression type also has a naive `evaluate`, which is the reference the evaluator must
//! agree with.

mod boolean;
mod config;
mod error;
mod evaluator;
mod exponent;
mod group;
mod lazy;
pub mod rewrite;
mod substitution;
mod visit;

pub use boolean::*;
pub use config::*;
pub use error::*;
pub use evaluator::*;
pub use exponent::*;
pub use group::*;
pub use lazy::*;
pub use rewrite::{
	RewriteRule, RewriteStrategy, Rewriter, RuleApplicator, RuleSet, DEFAULT_REWRITE_BUDGET,
};
pub use substitution::*;
pub use visit::*;
