// Copyright 2025 Irreducible Inc.

use std::{
	collections::BTreeSet,
	fmt::{self, Display},
};

use algebrix_algebra::Element;

use crate::{Error, ExponentExpr, ExprRef, GroupElementExpr, Substitutions};

/// Boolean-valued expressions: equality tests over exponents and group elements and their
/// combinations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BooleanExpr {
	Constant(bool),
	Not(Box<BooleanExpr>),
	And(Box<BooleanExpr>, Box<BooleanExpr>),
	Or(Box<BooleanExpr>, Box<BooleanExpr>),
	/// Equality of exponents, compared over the integers.
	ExponentEq(ExponentExpr, ExponentExpr),
	GroupEq(GroupElementExpr, GroupElementExpr),
}

impl Display for BooleanExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Constant(value) => write!(f, "{value}"),
			Self::Not(child) => write!(f, "!{child}"),
			Self::And(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
			Self::Or(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
			Self::ExponentEq(lhs, rhs) => write!(f, "({lhs} == {rhs})"),
			Self::GroupEq(lhs, rhs) => write!(f, "({lhs} == {rhs})"),
		}
	}
}

impl BooleanExpr {
	pub fn not(self) -> Self {
		Self::Not(Box::new(self))
	}

	pub fn and(self, rhs: Self) -> Self {
		Self::And(Box::new(self), Box::new(rhs))
	}

	pub fn or(self, rhs: Self) -> Self {
		Self::Or(Box::new(self), Box::new(rhs))
	}

	pub fn exponent_eq(lhs: impl Into<ExponentExpr>, rhs: impl Into<ExponentExpr>) -> Self {
		Self::ExponentEq(lhs.into(), rhs.into())
	}

	pub fn group_eq(lhs: GroupElementExpr, rhs: GroupElementExpr) -> Self {
		Self::GroupEq(lhs, rhs)
	}

	pub fn has_variables(&self) -> bool {
		match self {
			Self::Constant(_) => false,
			Self::Not(child) => child.has_variables(),
			Self::And(lhs, rhs) | Self::Or(lhs, rhs) => lhs.has_variables() || rhs.has_variables(),
			Self::ExponentEq(lhs, rhs) => lhs.has_variables() || rhs.has_variables(),
			Self::GroupEq(lhs, rhs) => lhs.has_variables() || rhs.has_variables(),
		}
	}

	pub fn variables(&self) -> BTreeSet<String> {
		let mut names = BTreeSet::new();
		self.collect_variables(&mut names);
		names
	}

	fn collect_variables(&self, names: &mut BTreeSet<String>) {
		self.visit_children(|child| match child {
			ExprRef::Exponent(exponent) => exponent.collect_variables(names),
			ExprRef::Group(group) => group.collect_variables(names),
			ExprRef::Boolean(boolean) => boolean.collect_variables(names),
		});
	}

	/// Calls `f` on every direct child.
	pub fn visit_children<'a>(&'a self, mut f: impl FnMut(ExprRef<'a>)) {
		match self {
			Self::Constant(_) => {}
			Self::Not(child) => f(ExprRef::Boolean(child)),
			Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
				f(ExprRef::Boolean(lhs));
				f(ExprRef::Boolean(rhs));
			}
			Self::ExponentEq(lhs, rhs) => {
				f(ExprRef::Exponent(lhs));
				f(ExprRef::Exponent(rhs));
			}
			Self::GroupEq(lhs, rhs) => {
				f(ExprRef::Group(lhs));
				f(ExprRef::Group(rhs));
			}
		}
	}

	/// Replaces bound variables and folds tests whose sides became constant.
	pub fn substitute(&self, bindings: &Substitutions) -> Self {
		match self {
			Self::Constant(_) => self.clone(),
			Self::Not(child) => match child.substitute(bindings) {
				Self::Constant(value) => Self::Constant(!value),
				child => child.not(),
			},
			Self::And(lhs, rhs) => match (lhs.substitute(bindings), rhs.substitute(bindings)) {
				(Self::Constant(false), _) | (_, Self::Constant(false)) => Self::Constant(false),
				(Self::Constant(true), other) | (other, Self::Constant(true)) => other,
				(lhs, rhs) => lhs.and(rhs),
			},
			Self::Or(lhs, rhs) => match (lhs.substitute(bindings), rhs.substitute(bindings)) {
				(Self::Constant(true), _) | (_, Self::Constant(true)) => Self::Constant(true),
				(Self::Constant(false), other) | (other, Self::Constant(false)) => other,
				(lhs, rhs) => lhs.or(rhs),
			},
			Self::ExponentEq(lhs, rhs) => match (lhs.substitute(bindings), rhs.substitute(bindings)) {
				(ExponentExpr::Constant(lhs), ExponentExpr::Constant(rhs)) => {
					Self::Constant(lhs == rhs)
				}
				(lhs, rhs) => Self::ExponentEq(lhs, rhs),
			},
			Self::GroupEq(lhs, rhs) => match (lhs.substitute(bindings), rhs.substitute(bindings)) {
				(GroupElementExpr::Constant(lhs), GroupElementExpr::Constant(rhs)) => {
					Self::Constant(lhs == rhs)
				}
				(lhs, rhs) => Self::GroupEq(lhs, rhs),
			},
		}
	}

	/// Replaces bound variables, leaving group powers unevaluated.
	pub(crate) fn bind(&self, bindings: &Substitutions) -> Self {
		match self {
			Self::Constant(_) => self.clone(),
			Self::Not(child) => child.bind(bindings).not(),
			Self::And(lhs, rhs) => lhs.bind(bindings).and(rhs.bind(bindings)),
			Self::Or(lhs, rhs) => lhs.bind(bindings).or(rhs.bind(bindings)),
			Self::ExponentEq(lhs, rhs) => {
				Self::ExponentEq(lhs.substitute(bindings), rhs.substitute(bindings))
			}
			Self::GroupEq(lhs, rhs) => Self::GroupEq(lhs.bind(bindings), rhs.bind(bindings)),
		}
	}

	/// Naive evaluation, short-circuiting `And` and `Or` from the left.
	pub fn evaluate(&self) -> Result<bool, Error> {
		match self {
			Self::Constant(value) => Ok(*value),
			Self::Not(child) => Ok(!child.evaluate()?),
			Self::And(lhs, rhs) => Ok(lhs.evaluate()? && rhs.evaluate()?),
			Self::Or(lhs, rhs) => Ok(lhs.evaluate()? || rhs.evaluate()?),
			Self::ExponentEq(lhs, rhs) => Ok(lhs.evaluate()? == rhs.evaluate()?),
			Self::GroupEq(lhs, rhs) => Ok(elements_equal(
				lhs.evaluate_partial()?,
				rhs.evaluate_partial()?,
			)),
		}
	}

	/// Substitutes `bindings` and evaluates naively.
	pub fn evaluate_with(&self, bindings: &Substitutions) -> Result<bool, Error> {
		self.substitute(bindings).evaluate()
	}
}

impl From<bool> for BooleanExpr {
	fn from(value: bool) -> Self {
		Self::Constant(value)
	}
}

/// Compares partially evaluated sides, where `None` is the neutral element of an unknown
/// structure.
pub(crate) fn elements_equal(lhs: Option<Element>, rhs: Option<Element>) -> bool {
	match (lhs, rhs) {
		(Some(lhs), Some(rhs)) => lhs == rhs,
		(Some(value), None) | (None, Some(value)) => value.is_neutral(),
		(None, None) => true,
	}
}

#[cfg(test)]
mod tests {
	use algebrix_algebra::{groups::IntegerMulGroup, Structure};
	use num_bigint::BigUint;

	use super::*;

	fn c(value: u32) -> GroupElementExpr {
		Structure::new(IntegerMulGroup::prime(BigUint::from(101u32)))
			.element(BigUint::from(value))
			.unwrap()
			.into()
	}

	#[test]
	fn test_evaluate() {
		// 2^100 == 1 in Z101*
		let fermat = BooleanExpr::group_eq(c(2).pow(100), GroupElementExpr::Empty(None));
		assert!(fermat.evaluate().unwrap());
		assert!(!fermat.clone().not().evaluate().unwrap());

		let x = ExponentExpr::variable("x");
		let test = fermat.and(BooleanExpr::exponent_eq(x * ExponentExpr::from(2), 10));
		let bindings = Substitutions::new().with_exponent("x", 5);
		assert!(test.evaluate_with(&bindings).unwrap());
		assert!(test.evaluate().is_err());
	}

	#[test]
	fn test_short_circuit() {
		let unbound = BooleanExpr::exponent_eq("x", 1);
		assert!(!BooleanExpr::Constant(false).and(unbound.clone()).evaluate().unwrap());
		assert!(BooleanExpr::Constant(true).or(unbound.clone()).evaluate().unwrap());
		assert_eq!(unbound.variables().into_iter().collect::<Vec<_>>(), ["x"]);
	}

	#[test]
	fn test_substitute_folds() {
		let test = BooleanExpr::group_eq(GroupElementExpr::variable("h"), c(3))
			.or(BooleanExpr::exponent_eq("x", 2));
		let bindings = Substitutions::new().with_element("h", c(3));
		assert_eq!(test.substitute(&bindings), BooleanExpr::Constant(true));
	}
}
