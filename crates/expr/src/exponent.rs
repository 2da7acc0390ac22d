// Copyright 2025 Irreducible Inc.

use std::{
	collections::{BTreeMap, BTreeSet},
	fmt::{self, Display},
	ops::{Add, Mul, Neg, Sub},
};

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::{Error, ExprRef, Substitutions};

/// Integer-valued expressions over named variables.
///
/// Exponent expressions evaluate either over the integers or, given a modulus, to a residue. Over
/// the integers `Inv` is only defined for the units `1` and `-1`, and negative powers only for
/// unit bases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExponentExpr {
	Constant(BigInt),
	Variable(String),
	Sum(Box<ExponentExpr>, Box<ExponentExpr>),
	Mul(Box<ExponentExpr>, Box<ExponentExpr>),
	Neg(Box<ExponentExpr>),
	Inv(Box<ExponentExpr>),
	Pow(Box<ExponentExpr>, Box<ExponentExpr>),
}

impl Display for ExponentExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Constant(value) => write!(f, "{value}"),
			Self::Variable(name) => f.write_str(name),
			Self::Sum(lhs, rhs) => write!(f, "({lhs} + {rhs})"),
			Self::Mul(lhs, rhs) => write!(f, "({lhs} * {rhs})"),
			Self::Neg(child) => write!(f, "-{child}"),
			Self::Inv(child) => write!(f, "{child}^-1"),
			Self::Pow(base, exponent) => write!(f, "{base}^{exponent}"),
		}
	}
}

impl ExponentExpr {
	pub fn constant(value: impl Into<BigInt>) -> Self {
		Self::Constant(value.into())
	}

	pub fn variable(name: impl Into<String>) -> Self {
		Self::Variable(name.into())
	}

	pub fn zero() -> Self {
		Self::Constant(BigInt::zero())
	}

	pub fn one() -> Self {
		Self::Constant(BigInt::one())
	}

	pub fn inv(self) -> Self {
		Self::Inv(Box::new(self))
	}

	pub fn pow(self, exponent: impl Into<ExponentExpr>) -> Self {
		Self::Pow(Box::new(self), Box::new(exponent.into()))
	}

	/// Returns `Some(value)` if the expression is a constant.
	pub fn as_constant(&self) -> Option<&BigInt> {
		match self {
			Self::Constant(value) => Some(value),
			_ => None,
		}
	}

	pub fn is_constant_value(&self, value: i64) -> bool {
		self.as_constant()
			.is_some_and(|constant| *constant == BigInt::from(value))
	}

	pub fn has_variables(&self) -> bool {
		match self {
			Self::Constant(_) => false,
			Self::Variable(_) => true,
			Self::Sum(lhs, rhs) | Self::Mul(lhs, rhs) | Self::Pow(lhs, rhs) => {
				lhs.has_variables() || rhs.has_variables()
			}
			Self::Neg(child) | Self::Inv(child) => child.has_variables(),
		}
	}

	/// Whether evaluating the expression takes an inverse, which makes its value depend on the
	/// modulus.
	pub fn has_inverse(&self) -> bool {
		match self {
			Self::Constant(_) | Self::Variable(_) => false,
			Self::Inv(_) => true,
			Self::Sum(lhs, rhs) | Self::Mul(lhs, rhs) | Self::Pow(lhs, rhs) => {
				lhs.has_inverse() || rhs.has_inverse()
			}
			Self::Neg(child) => child.has_inverse(),
		}
	}

	pub fn variables(&self) -> BTreeSet<String> {
		let mut names = BTreeSet::new();
		self.collect_variables(&mut names);
		names
	}

	pub(crate) fn collect_variables(&self, names: &mut BTreeSet<String>) {
		match self {
			Self::Variable(name) => {
				names.insert(name.clone());
			}
			_ => self.visit_children(|child| {
				if let ExprRef::Exponent(child) = child {
					child.collect_variables(names);
				}
			}),
		}
	}

	/// Calls `f` on every direct child.
	pub fn visit_children<'a>(&'a self, mut f: impl FnMut(ExprRef<'a>)) {
		match self {
			Self::Constant(_) | Self::Variable(_) => {}
			Self::Sum(lhs, rhs) | Self::Mul(lhs, rhs) | Self::Pow(lhs, rhs) => {
				f(ExprRef::Exponent(lhs));
				f(ExprRef::Exponent(rhs));
			}
			Self::Neg(child) | Self::Inv(child) => f(ExprRef::Exponent(child)),
		}
	}

	/// Replaces bound variables and folds constant sub-expressions.
	///
	/// Unbound variables are left in place.
	pub fn substitute(&self, bindings: &Substitutions) -> Self {
		match self {
			Self::Constant(_) => self.clone(),
			Self::Variable(name) => bindings
				.exponent(name)
				.cloned()
				.unwrap_or_else(|| self.clone()),
			Self::Sum(lhs, rhs) => Self::folded_sum(lhs.substitute(bindings), rhs.substitute(bindings)),
			Self::Mul(lhs, rhs) => {
				Self::folded_product(lhs.substitute(bindings), rhs.substitute(bindings))
			}
			Self::Neg(child) => Self::folded_neg(child.substitute(bindings)),
			Self::Inv(child) => match child.substitute(bindings) {
				Self::Constant(value) if value.magnitude().is_one() => Self::Constant(value),
				child => Self::Inv(Box::new(child)),
			},
			Self::Pow(base, exponent) => {
				Self::folded_pow(base.substitute(bindings), exponent.substitute(bindings))
			}
		}
	}

	/// Evaluates the expression over the integers.
	pub fn evaluate(&self) -> Result<BigInt, Error> {
		match self {
			Self::Constant(value) => Ok(value.clone()),
			Self::Variable(name) => Err(Error::UnboundVariable { name: name.clone() }),
			Self::Sum(lhs, rhs) => Ok(lhs.evaluate()? + rhs.evaluate()?),
			Self::Mul(lhs, rhs) => Ok(lhs.evaluate()? * rhs.evaluate()?),
			Self::Neg(child) => Ok(-child.evaluate()?),
			Self::Inv(child) => {
				let value = child.evaluate()?;
				if value.magnitude().is_one() {
					Ok(value)
				} else {
					Err(Error::NotInvertible {
						value: value.to_string(),
						modulus: "the integers".to_string(),
					})
				}
			}
			Self::Pow(base, exponent) => integer_pow(&base.evaluate()?, &exponent.evaluate()?),
		}
	}

	/// Evaluates the expression to a residue modulo `modulus`.
	///
	/// Exponents of `Pow` nodes are evaluated over the integers; a negative exponent inverts the
	/// base modulo `modulus`.
	pub fn evaluate_mod(&self, modulus: &BigUint) -> Result<BigUint, Error> {
		assert!(!modulus.is_zero(), "modulus must be positive");
		match self {
			Self::Constant(value) => Ok(reduce(value, modulus)),
			Self::Variable(name) => Err(Error::UnboundVariable { name: name.clone() }),
			Self::Sum(lhs, rhs) => {
				Ok((lhs.evaluate_mod(modulus)? + rhs.evaluate_mod(modulus)?) % modulus)
			}
			Self::Mul(lhs, rhs) => {
				Ok((lhs.evaluate_mod(modulus)? * rhs.evaluate_mod(modulus)?) % modulus)
			}
			Self::Neg(child) => Ok((modulus - child.evaluate_mod(modulus)?) % modulus),
			Self::Inv(child) => modular_inverse(&child.evaluate_mod(modulus)?, modulus),
			Self::Pow(base, exponent) => {
				let base = base.evaluate_mod(modulus)?;
				let exponent = exponent.evaluate()?;
				let base = if exponent.is_negative() {
					modular_inverse(&base, modulus)?
				} else {
					base
				};
				Ok(base.modpow(exponent.magnitude(), modulus))
			}
		}
	}

	/// Substitutes `bindings` and evaluates over the integers.
	pub fn evaluate_with(&self, bindings: &Substitutions) -> Result<BigInt, Error> {
		self.substitute(bindings).evaluate()
	}

	/// Splits the expression into `(constant, linear)` with `self == constant + linear`.
	///
	/// The constant part has no variables. The linear part is a sum of variable-free coefficients
	/// times variables, so it is additive in the bindings and zero when every variable is zero.
	///
	/// ## Throws
	///
	/// * [`Error::NonLinear`] if a product has two variable factors, or a variable occurs under
	///   an inverse or a power other than `x^0` and `x^1`.
	pub fn linearize(&self) -> Result<(ExponentExpr, ExponentExpr), Error> {
		Ok(self.linear_form()?.into_parts())
	}

	fn linear_form(&self) -> Result<LinearForm, Error> {
		let non_linear = |reason| Error::NonLinear {
			node: self.to_string(),
			reason,
		};
		match self {
			_ if !self.has_variables() => Ok(LinearForm::constant(self.clone())),
			Self::Constant(_) => unreachable!("constants have no variables"),
			Self::Variable(name) => Ok(LinearForm {
				constant: Self::zero(),
				coefficients: [(name.clone(), Self::one())].into(),
			}),
			Self::Sum(lhs, rhs) => Ok(lhs.linear_form()? + rhs.linear_form()?),
			Self::Mul(lhs, rhs) => match (lhs.has_variables(), rhs.has_variables()) {
				(true, true) => Err(non_linear("product of two variable factors")),
				(false, _) => Ok(rhs.linear_form()?.scale(lhs)),
				(true, false) => Ok(lhs.linear_form()?.scale(rhs)),
			},
			Self::Neg(child) => Ok(child.linear_form()?.scale(&Self::constant(-1))),
			Self::Inv(_) => Err(non_linear("inverse of a variable expression")),
			Self::Pow(base, exponent) => {
				if exponent.has_variables() {
					return Err(non_linear("variable in an exponent"));
				}
				match exponent.substitute(&Substitutions::default()) {
					exponent if exponent.is_constant_value(0) => {
						Ok(LinearForm::constant(Self::one()))
					}
					exponent if exponent.is_constant_value(1) => base.linear_form(),
					_ => Err(non_linear("power of a variable expression")),
				}
			}
		}
	}

	pub(crate) fn folded_sum(lhs: Self, rhs: Self) -> Self {
		match (lhs, rhs) {
			(Self::Constant(lhs), Self::Constant(rhs)) => Self::Constant(lhs + rhs),
			(Self::Constant(zero), other) | (other, Self::Constant(zero)) if zero.is_zero() => other,
			(lhs, rhs) => Self::Sum(Box::new(lhs), Box::new(rhs)),
		}
	}

	pub(crate) fn folded_product(lhs: Self, rhs: Self) -> Self {
		match (lhs, rhs) {
			(Self::Constant(lhs), Self::Constant(rhs)) => Self::Constant(lhs * rhs),
			(Self::Constant(zero), _) | (_, Self::Constant(zero)) if zero.is_zero() => {
				Self::Constant(zero)
			}
			(Self::Constant(one), other) | (other, Self::Constant(one)) if one.is_one() => other,
			(lhs, rhs) => Self::Mul(Box::new(lhs), Box::new(rhs)),
		}
	}

	pub(crate) fn folded_neg(child: Self) -> Self {
		match child {
			Self::Constant(value) => Self::Constant(-value),
			Self::Neg(inner) => *inner,
			child => Self::Neg(Box::new(child)),
		}
	}

	fn folded_pow(base: Self, exponent: Self) -> Self {
		match (base, exponent) {
			(_, exponent) if exponent.is_constant_value(0) => Self::one(),
			(base, exponent) if exponent.is_constant_value(1) => base,
			(Self::Constant(base), Self::Constant(exponent)) if is_small_power(&base, &exponent) => {
				match integer_pow(&base, &exponent) {
					Ok(value) => Self::Constant(value),
					Err(_) => Self::Pow(
						Box::new(Self::Constant(base)),
						Box::new(Self::Constant(exponent)),
					),
				}
			}
			(base, exponent) => Self::Pow(Box::new(base), Box::new(exponent)),
		}
	}
}

impl From<BigInt> for ExponentExpr {
	fn from(value: BigInt) -> Self {
		Self::Constant(value)
	}
}

macro_rules! impl_from_int {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for ExponentExpr {
				fn from(value: $ty) -> Self {
					Self::Constant(value.into())
				}
			}
		)*
	};
}

impl_from_int!(i32, i64, u32, u64, usize);

impl From<&str> for ExponentExpr {
	fn from(name: &str) -> Self {
		Self::Variable(name.to_string())
	}
}

impl Add for ExponentExpr {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		Self::Sum(Box::new(self), Box::new(rhs))
	}
}

impl Sub for ExponentExpr {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self {
		self + -rhs
	}
}

impl Mul for ExponentExpr {
	type Output = Self;

	fn mul(self, rhs: Self) -> Self {
		Self::Mul(Box::new(self), Box::new(rhs))
	}
}

impl Neg for ExponentExpr {
	type Output = Self;

	fn neg(self) -> Self {
		Self::Neg(Box::new(self))
	}
}

/// `constant + Σ coefficient * variable` with variable-free constant and coefficients.
struct LinearForm {
	constant: ExponentExpr,
	coefficients: BTreeMap<String, ExponentExpr>,
}

impl LinearForm {
	fn constant(constant: ExponentExpr) -> Self {
		Self {
			constant,
			coefficients: BTreeMap::new(),
		}
	}

	fn scale(self, factor: &ExponentExpr) -> Self {
		Self {
			constant: ExponentExpr::folded_product(factor.clone(), self.constant),
			coefficients: self
				.coefficients
				.into_iter()
				.map(|(name, coeff)| (name, ExponentExpr::folded_product(factor.clone(), coeff)))
				.collect(),
		}
	}

	/// The constant and the linear part.
	fn into_parts(self) -> (ExponentExpr, ExponentExpr) {
		let linear = self
			.coefficients
			.into_iter()
			.map(|(name, coeff)| ExponentExpr::folded_product(coeff, ExponentExpr::Variable(name)))
			.reduce(ExponentExpr::folded_sum)
			.unwrap_or_else(ExponentExpr::zero);
		(self.constant, linear)
	}
}

impl Add for LinearForm {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		let mut coefficients = self.coefficients;
		for (name, coeff) in rhs.coefficients {
			let merged = match coefficients.remove(&name) {
				Some(existing) => ExponentExpr::folded_sum(existing, coeff),
				None => coeff,
			};
			coefficients.insert(name, merged);
		}
		Self {
			constant: ExponentExpr::folded_sum(self.constant, rhs.constant),
			coefficients,
		}
	}
}

fn reduce(value: &BigInt, modulus: &BigUint) -> BigUint {
	let modulus = BigInt::from(modulus.clone());
	value
		.mod_floor(&modulus)
		.to_biguint()
		.expect("mod_floor by a positive modulus is non-negative")
}

fn modular_inverse(value: &BigUint, modulus: &BigUint) -> Result<BigUint, Error> {
	if modulus.is_one() {
		return Ok(BigUint::zero());
	}
	value.modinv(modulus).ok_or_else(|| Error::NotInvertible {
		value: value.to_string(),
		modulus: format!("Z/{modulus}"),
	})
}

/// Bound on the bit size of powers folded during substitution.
const MAX_FOLDED_POWER_BITS: u64 = 4096;

fn is_small_power(base: &BigInt, exponent: &BigInt) -> bool {
	exponent
		.to_u64()
		.is_some_and(|exponent| base.bits().saturating_mul(exponent) <= MAX_FOLDED_POWER_BITS)
}

fn integer_pow(base: &BigInt, exponent: &BigInt) -> Result<BigInt, Error> {
	let unit = base.magnitude().is_one();
	if exponent.is_negative() && !unit {
		return Err(Error::NegativeExponent {
			base: base.to_string(),
			exponent: exponent.to_string(),
		});
	}
	if unit || base.is_zero() {
		let odd = exponent.is_odd();
		return Ok(match (base.sign(), odd) {
			(Sign::NoSign, _) if exponent.is_zero() => BigInt::one(),
			(Sign::NoSign, _) => BigInt::zero(),
			(Sign::Minus, true) => -BigInt::one(),
			_ => BigInt::one(),
		});
	}
	let exponent = exponent
		.to_u32()
		.ok_or_else(|| Error::ExponentTooLarge {
			exponent: exponent.to_string(),
		})?;
	Ok(base.pow(exponent))
}
