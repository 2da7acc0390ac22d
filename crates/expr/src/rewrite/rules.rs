// Copyright 2025 Irreducible Inc.

use super::RewriteRule;
use crate::{BooleanExpr, ExponentExpr, GroupElementExpr};

type G = GroupElementExpr;

/// `1 · x => x`, `1^x => 1`, `g^0 => 1`, `g^1 => g`, `1^-1 => 1` and pairings with a neutral
/// argument.
///
/// `g^0` is only eliminated when the structure of `g` is known, so the result still knows its
/// structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyElimination;

impl RewriteRule<G> for EmptyElimination {
	fn name(&self) -> &'static str {
		"EmptyElimination"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		match expr {
			G::Op(lhs, rhs) => matches!(**lhs, G::Empty(_)) || matches!(**rhs, G::Empty(_)),
			G::Inv(child) => matches!(**child, G::Empty(_)),
			G::Pow(base, exponent) => {
				matches!(**base, G::Empty(_))
					|| exponent.is_constant_value(1)
					|| (exponent.is_constant_value(0) && base.structure().is_some())
			}
			G::Pairing(_, lhs, rhs) => lhs.is_neutral() || rhs.is_neutral(),
			_ => false,
		}
	}

	fn apply(&self, expr: &G) -> G {
		match expr {
			G::Op(lhs, rhs) => G::folded_op(lhs.as_ref().clone(), rhs.as_ref().clone()),
			G::Inv(child) => child.as_ref().clone(),
			G::Pow(base, _) if matches!(**base, G::Empty(_)) => base.as_ref().clone(),
			G::Pow(base, exponent) if exponent.is_constant_value(1) => base.as_ref().clone(),
			G::Pow(base, _) => G::Empty(base.structure()),
			G::Pairing(pairing, _, _) => G::neutral(pairing.gt()),
			_ => expr.clone(),
		}
	}
}

/// `(x^-1)^-1 => x`, `(g^x)^-1 => g^-x` and `(g^-1)^x => g^-x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvPushdown;

impl RewriteRule<G> for InvPushdown {
	fn name(&self) -> &'static str {
		"InvPushdown"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		match expr {
			G::Inv(child) => matches!(**child, G::Inv(_) | G::Pow(..)),
			G::Pow(base, _) => matches!(**base, G::Inv(_)),
			_ => false,
		}
	}

	fn apply(&self, expr: &G) -> G {
		match expr {
			G::Inv(child) => match child.as_ref() {
				G::Inv(inner) => inner.as_ref().clone(),
				G::Pow(base, exponent) => negated_pow(base, exponent),
				_ => expr.clone(),
			},
			G::Pow(base, exponent) => match base.as_ref() {
				G::Inv(inner) => negated_pow(inner, exponent),
				_ => expr.clone(),
			},
			_ => expr.clone(),
		}
	}
}

fn negated_pow(base: &G, exponent: &ExponentExpr) -> G {
	base.clone().pow(ExponentExpr::folded_neg(exponent.clone()))
}

/// `(g^x)^c => (g^c)^x` for a variable-free `g` and `c` and a variable `x`.
///
/// Moves the constant exponent onto the constant base, where `g^c` can be precomputed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpSwap;

impl RewriteRule<G> for ExpSwap {
	fn name(&self) -> &'static str {
		"ExpSwap"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		match expr {
			G::Pow(inner, outer) => match inner.as_ref() {
				G::Pow(base, exponent) => {
					!base.has_variables() && exponent.has_variables() && !outer.has_variables()
				}
				_ => false,
			},
			_ => false,
		}
	}

	fn apply(&self, expr: &G) -> G {
		match expr {
			G::Pow(inner, outer) => match inner.as_ref() {
				G::Pow(base, exponent) => base
					.as_ref()
					.clone()
					.pow(outer.clone())
					.pow(exponent.clone()),
				_ => expr.clone(),
			},
			_ => expr.clone(),
		}
	}
}

/// `g^(c*x) => (g^c)^x` for a variable-free `g` and `c` and a variable `x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowExpMulLeft;

/// `g^(x*c) => (g^c)^x` for a variable-free `g` and `c` and a variable `x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowExpMulRight;

/// The `(constant, variable)` factors of a product exponent over a constant base.
fn split_product_exponent(expr: &G, constant_left: bool) -> Option<(&G, &ExponentExpr, &ExponentExpr)> {
	let G::Pow(base, ExponentExpr::Mul(lhs, rhs)) = expr else {
		return None;
	};
	let (constant, variable) = if constant_left {
		(lhs.as_ref(), rhs.as_ref())
	} else {
		(rhs.as_ref(), lhs.as_ref())
	};
	(!base.has_variables() && !constant.has_variables() && variable.has_variables())
		.then_some((base.as_ref(), constant, variable))
}

fn hoist_constant_factor(expr: &G, constant_left: bool) -> G {
	match split_product_exponent(expr, constant_left) {
		Some((base, constant, variable)) => base.clone().pow(constant.clone()).pow(variable.clone()),
		None => expr.clone(),
	}
}

impl RewriteRule<G> for PowExpMulLeft {
	fn name(&self) -> &'static str {
		"PowExpMulLeft"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		split_product_exponent(expr, true).is_some()
	}

	fn apply(&self, expr: &G) -> G {
		hoist_constant_factor(expr, true)
	}
}

impl RewriteRule<G> for PowExpMulRight {
	fn name(&self) -> &'static str {
		"PowExpMulRight"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		split_product_exponent(expr, false).is_some()
	}

	fn apply(&self, expr: &G) -> G {
		hoist_constant_factor(expr, false)
	}
}

/// `(g^a)^b => g^(a*b)` when exactly one of `a` and `b` has variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeNestedVarExp;

/// `(g^a)^b => g^(a*b)` when neither `a` nor `b` has variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeNestedConstExp;

fn nested_exponents(expr: &G) -> Option<(&G, &ExponentExpr, &ExponentExpr)> {
	match expr {
		G::Pow(inner, outer) => match inner.as_ref() {
			G::Pow(base, exponent) => Some((base.as_ref(), exponent, outer)),
			_ => None,
		},
		_ => None,
	}
}

fn merge_nested(expr: &G) -> G {
	match nested_exponents(expr) {
		Some((base, inner, outer)) => base
			.clone()
			.pow(ExponentExpr::folded_product(inner.clone(), outer.clone())),
		None => expr.clone(),
	}
}

impl RewriteRule<G> for MergeNestedVarExp {
	fn name(&self) -> &'static str {
		"MergeNestedVarExp"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		nested_exponents(expr)
			.is_some_and(|(_, inner, outer)| inner.has_variables() != outer.has_variables())
	}

	fn apply(&self, expr: &G) -> G {
		merge_nested(expr)
	}
}

impl RewriteRule<G> for MergeNestedConstExp {
	fn name(&self) -> &'static str {
		"MergeNestedConstExp"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		nested_exponents(expr)
			.is_some_and(|(_, inner, outer)| !inner.has_variables() && !outer.has_variables())
	}

	fn apply(&self, expr: &G) -> G {
		merge_nested(expr)
	}
}

/// `e(g, h)^c => e(g^c, h)` or `e(g, h^c)` for a variable-free `c`.
///
/// The exponent moves into the argument without variables when there is exactly one, and into
/// the left argument otherwise. Exponents are reduced modulo the order of the structure they act
/// on, so the rule requires the chosen source group to have the order of the target group unless
/// `c` evaluates over the integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairingGtExp;

impl PairingGtExp {
	/// Whether the exponent goes into the right argument.
	fn into_rhs(lhs: &G, rhs: &G) -> bool {
		lhs.has_variables() && !rhs.has_variables()
	}
}

impl RewriteRule<G> for PairingGtExp {
	fn name(&self) -> &'static str {
		"PairingGtExp"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		let G::Pow(inner, exponent) = expr else {
			return false;
		};
		let G::Pairing(pairing, lhs, rhs) = inner.as_ref() else {
			return false;
		};
		if exponent.has_variables() {
			return false;
		}
		let source = if Self::into_rhs(lhs, rhs) {
			pairing.g2()
		} else {
			pairing.g1()
		};
		source.size() == pairing.gt().size() || exponent.evaluate().is_ok()
	}

	fn apply(&self, expr: &G) -> G {
		let G::Pow(inner, exponent) = expr else {
			return expr.clone();
		};
		let G::Pairing(pairing, lhs, rhs) = inner.as_ref() else {
			return expr.clone();
		};
		let (lhs, rhs) = (lhs.as_ref().clone(), rhs.as_ref().clone());
		if Self::into_rhs(&lhs, &rhs) {
			G::pairing(pairing.clone(), lhs, rhs.pow(exponent.clone()))
		} else {
			G::pairing(pairing.clone(), lhs.pow(exponent.clone()), rhs)
		}
	}
}

/// `(a·b)^x => a^x · b^x`, only over structures known to be commutative.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpInPow;

impl RewriteRule<G> for OpInPow {
	fn name(&self) -> &'static str {
		"OpInPow"
	}

	fn is_applicable(&self, expr: &G) -> bool {
		match expr {
			G::Pow(base, _) => matches!(**base, G::Op(..)) && base.is_commutative(),
			_ => false,
		}
	}

	fn apply(&self, expr: &G) -> G {
		match expr {
			G::Pow(base, exponent) => match base.as_ref() {
				G::Op(lhs, rhs) => {
					let lhs = lhs.as_ref().clone().pow(exponent.clone());
					let rhs = rhs.as_ref().clone().pow(exponent.clone());
					lhs.op(rhs)
				}
				_ => expr.clone(),
			},
			_ => expr.clone(),
		}
	}
}

/// `lhs = rhs => lhs · rhs^-1 = 1`, so both sides evaluate as one multi-exponentiation.
///
/// Requires both sides to be of the same known structure and `rhs` not to be neutral already.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveEqTestToOneSide;

impl RewriteRule<BooleanExpr> for MoveEqTestToOneSide {
	fn name(&self) -> &'static str {
		"MoveEqTestToOneSide"
	}

	fn is_applicable(&self, expr: &BooleanExpr) -> bool {
		match expr {
			BooleanExpr::GroupEq(lhs, rhs) => {
				!rhs.is_neutral()
					&& lhs
						.structure()
						.is_some_and(|structure| rhs.structure() == Some(structure))
			}
			_ => false,
		}
	}

	fn apply(&self, expr: &BooleanExpr) -> BooleanExpr {
		match expr {
			BooleanExpr::GroupEq(lhs, rhs) => BooleanExpr::GroupEq(
				lhs.clone().op(rhs.clone().inv()),
				G::Empty(lhs.structure()),
			),
			_ => expr.clone(),
		}
	}
}
