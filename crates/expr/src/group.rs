// Copyright 2025 Irreducible Inc.

use std::{
	collections::BTreeSet,
	fmt::{self, Display},
	ops::Mul,
};

use algebrix_algebra::{Element, Pairing, Structure};
use num_bigint::BigInt;

use crate::{Error, ExponentExpr, ExprRef, Substitutions};

/// Group-element-valued expressions.
///
/// Leaves are constant elements, variables, and `Empty`, the neutral element of a possibly unknown
/// structure which is absorbed by the group operation. Exponents of `Pow` nodes are evaluated
/// modulo the order of the base's structure when it is known, and over the integers otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupElementExpr {
	Constant(Element),
	Variable {
		name: String,
		structure: Option<Structure>,
	},
	Empty(Option<Structure>),
	Op(Box<GroupElementExpr>, Box<GroupElementExpr>),
	Inv(Box<GroupElementExpr>),
	Pow(Box<GroupElementExpr>, ExponentExpr),
	Pairing(Pairing, Box<GroupElementExpr>, Box<GroupElementExpr>),
}

impl Display for GroupElementExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Constant(element) => write!(f, "{element}"),
			Self::Variable { name, .. } => f.write_str(name),
			Self::Empty(_) => f.write_str("1"),
			Self::Op(lhs, rhs) => write!(f, "({lhs} · {rhs})"),
			Self::Inv(child) => write!(f, "{child}^-1"),
			Self::Pow(base, exponent) => write!(f, "{base}^{exponent}"),
			Self::Pairing(_, lhs, rhs) => write!(f, "e({lhs}, {rhs})"),
		}
	}
}

impl GroupElementExpr {
	pub fn constant(element: Element) -> Self {
		Self::Constant(element)
	}

	/// A variable whose structure is unknown until it is bound.
	pub fn variable(name: impl Into<String>) -> Self {
		Self::Variable {
			name: name.into(),
			structure: None,
		}
	}

	pub fn typed_variable(name: impl Into<String>, structure: Structure) -> Self {
		Self::Variable {
			name: name.into(),
			structure: Some(structure),
		}
	}

	pub fn neutral(structure: Structure) -> Self {
		Self::Empty(Some(structure))
	}

	pub fn op(self, rhs: Self) -> Self {
		Self::Op(Box::new(self), Box::new(rhs))
	}

	pub fn inv(self) -> Self {
		Self::Inv(Box::new(self))
	}

	pub fn pow(self, exponent: impl Into<ExponentExpr>) -> Self {
		Self::Pow(Box::new(self), exponent.into())
	}

	pub fn pairing(pairing: Pairing, lhs: Self, rhs: Self) -> Self {
		Self::Pairing(pairing, Box::new(lhs), Box::new(rhs))
	}

	/// The structure the expression evaluates into, if known.
	pub fn structure(&self) -> Option<Structure> {
		match self {
			Self::Constant(element) => Some(element.structure().clone()),
			Self::Variable { structure, .. } | Self::Empty(structure) => structure.clone(),
			Self::Op(lhs, rhs) => lhs.structure().or_else(|| rhs.structure()),
			Self::Inv(child) | Self::Pow(child, _) => child.structure(),
			Self::Pairing(pairing, _, _) => Some(pairing.gt()),
		}
	}

	/// Whether the structure is known to be commutative.
	pub fn is_commutative(&self) -> bool {
		self.structure()
			.is_some_and(|structure| structure.is_commutative())
	}

	/// Whether the node is `Empty` or a constant neutral element.
	pub fn is_neutral(&self) -> bool {
		match self {
			Self::Empty(_) => true,
			Self::Constant(element) => element.is_neutral(),
			_ => false,
		}
	}

	/// Whether the expression has group or exponent variables.
	pub fn has_variables(&self) -> bool {
		match self {
			Self::Constant(_) | Self::Empty(_) => false,
			Self::Variable { .. } => true,
			Self::Op(lhs, rhs) | Self::Pairing(_, lhs, rhs) => {
				lhs.has_variables() || rhs.has_variables()
			}
			Self::Inv(child) => child.has_variables(),
			Self::Pow(base, exponent) => base.has_variables() || exponent.has_variables(),
		}
	}

	/// Names of all group and exponent variables.
	pub fn variables(&self) -> BTreeSet<String> {
		let mut names = BTreeSet::new();
		self.collect_variables(&mut names);
		names
	}

	pub(crate) fn collect_variables(&self, names: &mut BTreeSet<String>) {
		if let Self::Variable { name, .. } = self {
			names.insert(name.clone());
		}
		self.visit_children(|child| match child {
			ExprRef::Exponent(exponent) => exponent.collect_variables(names),
			ExprRef::Group(group) => group.collect_variables(names),
			ExprRef::Boolean(_) => unreachable!("group expressions have no boolean children"),
		});
	}

	/// Calls `f` on every direct child, including exponents.
	pub fn visit_children<'a>(&'a self, mut f: impl FnMut(ExprRef<'a>)) {
		match self {
			Self::Constant(_) | Self::Variable { .. } | Self::Empty(_) => {}
			Self::Op(lhs, rhs) | Self::Pairing(_, lhs, rhs) => {
				f(ExprRef::Group(lhs));
				f(ExprRef::Group(rhs));
			}
			Self::Inv(child) => f(ExprRef::Group(child)),
			Self::Pow(base, exponent) => {
				f(ExprRef::Group(base));
				f(ExprRef::Exponent(exponent));
			}
		}
	}

	/// Replaces bound variables and folds what becomes constant.
	///
	/// Folding removes `Empty` operands, double inverses, zero and unit exponents, and evaluates
	/// operations on constants.
	pub fn substitute(&self, bindings: &Substitutions) -> Self {
		match self {
			Self::Constant(_) | Self::Empty(_) => self.clone(),
			Self::Variable { name, .. } => bindings
				.element(name)
				.cloned()
				.unwrap_or_else(|| self.clone()),
			Self::Op(lhs, rhs) => Self::folded_op(lhs.substitute(bindings), rhs.substitute(bindings)),
			Self::Inv(child) => match child.substitute(bindings) {
				Self::Inv(inner) => *inner,
				Self::Constant(element) => Self::Constant(element.inv()),
				empty @ Self::Empty(_) => empty,
				child => child.inv(),
			},
			Self::Pow(base, exponent) => {
				Self::folded_pow(base.substitute(bindings), exponent.substitute(bindings))
			}
			Self::Pairing(pairing, lhs, rhs) => {
				match (lhs.substitute(bindings), rhs.substitute(bindings)) {
					(Self::Constant(lhs), Self::Constant(rhs)) => {
						Self::Constant(pairing.apply(&lhs, &rhs))
					}
					(lhs, rhs) => Self::pairing(pairing.clone(), lhs, rhs),
				}
			}
		}
	}

	/// Replaces bound variables without folding, so every power is left for the evaluator to
	/// batch.
	pub(crate) fn bind(&self, bindings: &Substitutions) -> Self {
		match self {
			Self::Constant(_) | Self::Empty(_) => self.clone(),
			Self::Variable { name, .. } => bindings
				.element(name)
				.cloned()
				.unwrap_or_else(|| self.clone()),
			Self::Op(lhs, rhs) => lhs.bind(bindings).op(rhs.bind(bindings)),
			Self::Inv(child) => child.bind(bindings).inv(),
			Self::Pow(base, exponent) => base.bind(bindings).pow(exponent.substitute(bindings)),
			Self::Pairing(pairing, lhs, rhs) => {
				Self::pairing(pairing.clone(), lhs.bind(bindings), rhs.bind(bindings))
			}
		}
	}

	pub(crate) fn folded_op(lhs: Self, rhs: Self) -> Self {
		match (lhs, rhs) {
			(Self::Empty(lhs), Self::Empty(rhs)) => Self::Empty(lhs.or(rhs)),
			(Self::Empty(_), other) | (other, Self::Empty(_)) => other,
			(Self::Constant(lhs), Self::Constant(rhs)) => Self::Constant(lhs.op(&rhs)),
			(lhs, rhs) => lhs.op(rhs),
		}
	}

	fn folded_pow(base: Self, exponent: ExponentExpr) -> Self {
		match (base, exponent) {
			(base, exponent) if exponent.is_constant_value(1) => base,
			(base, exponent) if exponent.is_constant_value(0) && base.structure().is_some() => {
				Self::Empty(base.structure())
			}
			(empty @ Self::Empty(_), _) => empty,
			(Self::Constant(base), ExponentExpr::Constant(exponent)) => {
				Self::Constant(base.pow(&exponent))
			}
			(base, exponent) => base.pow(exponent),
		}
	}

	/// Naive recursive evaluation.
	///
	/// ## Throws
	///
	/// * [`Error::UnboundVariable`] on any variable
	/// * [`Error::UnknownStructure`] if the whole expression is `Empty` of unknown structure
	pub fn evaluate(&self) -> Result<Element, Error> {
		self.evaluate_partial()?
			.ok_or_else(|| Error::UnknownStructure {
				node: self.to_string(),
			})
	}

	/// Substitutes `bindings` and evaluates naively.
	pub fn evaluate_with(&self, bindings: &Substitutions) -> Result<Element, Error> {
		self.substitute(bindings).evaluate()
	}

	/// `None` stands for the neutral element of an unknown structure.
	pub(crate) fn evaluate_partial(&self) -> Result<Option<Element>, Error> {
		let value = match self {
			Self::Constant(element) => Some(element.clone()),
			Self::Variable { name, .. } => {
				return Err(Error::UnboundVariable { name: name.clone() });
			}
			Self::Empty(structure) => structure.as_ref().map(Structure::neutral_element),
			Self::Op(lhs, rhs) => match (lhs.evaluate_partial()?, rhs.evaluate_partial()?) {
				(Some(lhs), Some(rhs)) => Some(lhs.op(&rhs)),
				(value, None) | (None, value) => value,
			},
			Self::Inv(child) => child.evaluate_partial()?.map(|element| element.inv()),
			Self::Pow(base, exponent) => match base.evaluate_partial()? {
				Some(base) => {
					let exponent = evaluate_exponent_in(exponent, base.structure())?;
					Some(base.pow(&exponent))
				}
				None => None,
			},
			Self::Pairing(pairing, lhs, rhs) => {
				let lhs = lhs
					.evaluate_partial()?
					.unwrap_or_else(|| pairing.g1().neutral_element());
				let rhs = rhs
					.evaluate_partial()?
					.unwrap_or_else(|| pairing.g2().neutral_element());
				Some(pairing.apply(&lhs, &rhs))
			}
		};
		Ok(value)
	}

	/// Splits the expression into `(constant, linear)` with `self == constant · linear`.
	///
	/// The constant part has no variables. The linear part is a product of variables and of
	/// variable-free bases raised to linear exponents, so over a commutative structure it is a
	/// homomorphism of the bindings.
	///
	/// ## Throws
	///
	/// * [`Error::NonLinear`] for a variable base raised to a variable exponent, a pairing of two
	///   variable arguments, or when splitting would reorder factors of a structure not known to
	///   be commutative
	pub fn linearize(&self) -> Result<(GroupElementExpr, GroupElementExpr), Error> {
		let structure = self.structure();
		let split = self.split()?;
		Ok((
			product(split.constant, structure.clone()),
			product(split.linear, structure),
		))
	}

	fn split(&self) -> Result<Split, Error> {
		if !self.has_variables() {
			return Ok(Split::constant(self.clone()));
		}
		let non_linear = |reason| Error::NonLinear {
			node: self.to_string(),
			reason,
		};
		const REORDER: &str = "splitting reorders factors of a structure not known to be commutative";

		let split = match self {
			Self::Variable { .. } => Split::linear(self.clone()),
			Self::Constant(_) | Self::Empty(_) => unreachable!("leaves without variables"),
			Self::Op(lhs, rhs) => {
				let lhs = lhs.split()?;
				let rhs = rhs.split()?;
				if !lhs.linear.is_empty() && !rhs.constant.is_empty() && !self.is_commutative() {
					return Err(non_linear(REORDER));
				}
				Split {
					constant: [lhs.constant, rhs.constant].concat(),
					linear: [lhs.linear, rhs.linear].concat(),
				}
			}
			Self::Inv(child) => {
				let structure = child.structure();
				let split = child.split()?;
				if split.is_mixed() && !self.is_commutative() {
					return Err(non_linear(REORDER));
				}
				split.map(|parts| product(parts, structure.clone()).inv())
			}
			Self::Pow(base, exponent) => match (base.has_variables(), exponent.has_variables()) {
				(true, true) => return Err(non_linear("variable base raised to a variable exponent")),
				(false, _) => {
					let (constant, linear) = exponent.linearize()?;
					let constant = if constant.is_constant_value(0) {
						Vec::new()
					} else {
						vec![base.as_ref().clone().pow(constant)]
					};
					Split {
						constant,
						linear: vec![base.as_ref().clone().pow(linear)],
					}
				}
				(true, false) => {
					let structure = base.structure();
					let split = base.split()?;
					if split.is_mixed() && !self.is_commutative() {
						return Err(non_linear(REORDER));
					}
					split.map(|parts| product(parts, structure.clone()).pow(exponent.clone()))
				}
			},
			Self::Pairing(pairing, lhs, rhs) => match (lhs.has_variables(), rhs.has_variables()) {
				(true, true) => return Err(non_linear("pairing of two variable arguments")),
				(true, false) => lhs.split()?.map(|parts| {
					Self::pairing(pairing.clone(), product(parts, Some(pairing.g1())), *rhs.clone())
				}),
				(false, _) => rhs.split()?.map(|parts| {
					Self::pairing(pairing.clone(), *lhs.clone(), product(parts, Some(pairing.g2())))
				}),
			},
		};
		Ok(split)
	}
}

impl From<Element> for GroupElementExpr {
	fn from(element: Element) -> Self {
		Self::Constant(element)
	}
}

impl Mul for GroupElementExpr {
	type Output = Self;

	fn mul(self, rhs: Self) -> Self {
		self.op(rhs)
	}
}

/// Evaluates a group exponent: modulo the order of `structure` when known, over the integers
/// otherwise.
pub fn evaluate_exponent_in(exponent: &ExponentExpr, structure: &Structure) -> Result<BigInt, Error> {
	match structure.size() {
		Some(order) => Ok(exponent.evaluate_mod(&order)?.into()),
		None => exponent.evaluate(),
	}
}

/// The product of `parts` in order, or `Empty` when there are none.
fn product(parts: Vec<GroupElementExpr>, structure: Option<Structure>) -> GroupElementExpr {
	parts
		.into_iter()
		.reduce(GroupElementExpr::op)
		.unwrap_or(GroupElementExpr::Empty(structure))
}

/// Ordered constant and linear factors of a linearized expression.
struct Split {
	constant: Vec<GroupElementExpr>,
	linear: Vec<GroupElementExpr>,
}

impl Split {
	fn constant(expr: GroupElementExpr) -> Self {
		Self {
			constant: vec![expr],
			linear: Vec::new(),
		}
	}

	fn linear(expr: GroupElementExpr) -> Self {
		Self {
			constant: Vec::new(),
			linear: vec![expr],
		}
	}

	fn is_mixed(&self) -> bool {
		!self.constant.is_empty() && !self.linear.is_empty()
	}

	/// Applies `f` to the product of each non-empty part.
	fn map(self, f: impl Fn(Vec<GroupElementExpr>) -> GroupElementExpr) -> Self {
		let apply = |parts: Vec<GroupElementExpr>| {
			if parts.is_empty() {
				parts
			} else {
				vec![f(parts)]
			}
		};
		Self {
			constant: apply(self.constant),
			linear: apply(self.linear),
		}
	}
}

#[cfg(test)]
mod tests {
	use algebrix_algebra::groups::{Gl2Group, IntegerMulGroup};
	use assert_matches::assert_matches;
	use num_bigint::BigUint;

	use super::*;

	fn z101() -> Structure {
		Structure::new(IntegerMulGroup::prime(BigUint::from(101u32)))
	}

	fn c(value: u32) -> GroupElementExpr {
		z101().element(BigUint::from(value)).unwrap().into()
	}

	fn x() -> ExponentExpr {
		ExponentExpr::variable("x")
	}

	#[test]
	fn test_naive_evaluation() {
		let expr = c(2).pow(3) * c(5).pow(5) * c(7).pow(7);
		assert_eq!(expr.evaluate().unwrap(), c(23).evaluate().unwrap());

		// exponents are reduced modulo the group order 100
		let expr = c(2).pow(ExponentExpr::from(3).inv());
		let value = expr.evaluate().unwrap();
		assert_eq!(value.pow(&BigInt::from(3)), c(2).evaluate().unwrap());

		assert_matches!(GroupElementExpr::Empty(None).evaluate(), Err(Error::UnknownStructure { .. }));
		assert_eq!(
			(GroupElementExpr::Empty(None) * c(3)).evaluate().unwrap(),
			c(3).evaluate().unwrap()
		);
	}

	#[test]
	fn test_substitute_folds() {
		let bindings = Substitutions::new().with_exponent("x", 0).with_element("h", c(3));
		let expr = c(2).pow(x()) * GroupElementExpr::variable("h").inv().inv();
		assert_eq!(expr.substitute(&bindings), c(3));
		assert_matches!(
			GroupElementExpr::variable("h").evaluate(),
			Err(Error::UnboundVariable { name }) if name == "h"
		);
	}

	#[test]
	fn test_linearize_commutative() {
		let expr = c(2).pow(ExponentExpr::from(3) * x() + ExponentExpr::from(4)) * c(5);
		let (constant, linear) = expr.linearize().unwrap();
		assert!(!constant.has_variables());
		assert_eq!(
			constant.evaluate().unwrap(),
			(c(2).pow(4) * c(5)).evaluate().unwrap()
		);
		let bindings = Substitutions::new().with_exponent("x", 11);
		assert_eq!(
			linear.evaluate_with(&bindings).unwrap(),
			c(2).pow(33).evaluate().unwrap()
		);
	}

	#[test]
	fn test_linearize_rejections() {
		let g = GroupElementExpr::variable("g");
		assert_matches!(g.clone().pow(x()).linearize(), Err(Error::NonLinear { .. }));

		let gl2 = Structure::new(Gl2Group::new(BigUint::from(7u32)).unwrap());
		let m = GroupElementExpr::constant(gl2.element(Gl2Group::matrix(1, 1, 0, 1)).unwrap());
		let v = GroupElementExpr::typed_variable("v", gl2);
		// v · m would need m moved in front of v
		assert_matches!((v.clone() * m.clone()).linearize(), Err(Error::NonLinear { .. }));
		assert!((m * v).linearize().is_ok());
	}
}
