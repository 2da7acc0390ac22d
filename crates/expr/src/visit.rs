// Copyright 2025 Irreducible Inc.

use crate::{BooleanExpr, ExponentExpr, GroupElementExpr};

/// A borrowed child of an expression node, of any of the three expression families.
#[derive(Debug, Clone, Copy)]
pub enum ExprRef<'a> {
	Exponent(&'a ExponentExpr),
	Group(&'a GroupElementExpr),
	Boolean(&'a BooleanExpr),
}
