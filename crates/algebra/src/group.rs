// Copyright 2025 Irreducible Inc.

use std::{
	any::Any,
	fmt::{self, Debug, Display},
	hash::{Hash, Hasher},
	sync::Arc,
};

use auto_impl::auto_impl;
use num_bigint::{BigInt, BigUint};
use num_traits::Signed;
use rand::RngCore;

use crate::Error;

/// The group law of a concrete algebraic structure over a typed value.
///
/// Implementors describe a single mathematical group. Two implementors returning the same
/// [`label`](GroupLaw::label) must describe the same group, since handles compare by label and
/// share precomputation on that basis.
#[auto_impl(Box, Arc)]
pub trait GroupLaw: Debug + Send + Sync + 'static {
	type Value: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

	/// A label identifying the group up to mathematical equality, e.g. `Zn*(101)`.
	fn label(&self) -> String;

	fn neutral(&self) -> Self::Value;

	fn op(&self, lhs: &Self::Value, rhs: &Self::Value) -> Self::Value;

	fn inv(&self, value: &Self::Value) -> Self::Value;

	/// Raises `value` to a signed exponent.
	///
	/// The default is left-to-right square-and-multiply, inverting the base first for negative
	/// exponents.
	fn pow(&self, value: &Self::Value, exponent: &BigInt) -> Self::Value {
		let base = if exponent.is_negative() {
			self.inv(value)
		} else {
			value.clone()
		};
		let magnitude = exponent.magnitude();
		let mut acc = self.neutral();
		for i in (0..magnitude.bits()).rev() {
			acc = self.op(&acc, &acc);
			if magnitude.bit(i) {
				acc = self.op(&acc, &base);
			}
		}
		acc
	}

	/// The group order, if known.
	fn size(&self) -> Option<BigUint>;

	fn is_commutative(&self) -> bool;

	fn random(&self, rng: &mut dyn RngCore) -> Self::Value;

	/// A generator of the group, for cyclic groups of known order.
	fn generator(&self) -> Result<Self::Value, Error> {
		Err(Error::UnsupportedOperation {
			structure: self.label(),
			operation: "generator",
		})
	}

	/// Checks that `value` represents an element of this group, reducing it to canonical form.
	fn normalize(&self, value: Self::Value) -> Result<Self::Value, Error> {
		Ok(value)
	}

	fn encode(&self, value: &Self::Value) -> Vec<u8>;

	fn decode(&self, bytes: &[u8]) -> Result<Self::Value, Error>;
}

type ErasedValue = Arc<dyn Any + Send + Sync>;

/// Object-safe mirror of [`GroupLaw`] over type-erased values.
trait ErasedGroup: Debug + Send + Sync {
	fn neutral(&self) -> ErasedValue;
	fn op(&self, lhs: &dyn Any, rhs: &dyn Any) -> ErasedValue;
	fn inv(&self, value: &dyn Any) -> ErasedValue;
	fn pow(&self, value: &dyn Any, exponent: &BigInt) -> ErasedValue;
	fn size(&self) -> Option<BigUint>;
	fn is_commutative(&self) -> bool;
	fn random(&self, rng: &mut dyn RngCore) -> ErasedValue;
	fn generator(&self) -> Result<ErasedValue, Error>;
	fn normalize(&self, value: &dyn Any) -> Result<ErasedValue, Error>;
	fn encode(&self, value: &dyn Any) -> Vec<u8>;
	fn decode(&self, bytes: &[u8]) -> Result<ErasedValue, Error>;
	fn eq_values(&self, lhs: &dyn Any, rhs: &dyn Any) -> bool;
	fn hash_value(&self, value: &dyn Any, state: &mut dyn Hasher);
	fn fmt_value(&self, value: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result;
	fn as_any(&self) -> &dyn Any;
}

#[derive(Debug)]
struct Erased<G>(G);

impl<G: GroupLaw> Erased<G> {
	fn typed<'a>(&self, value: &'a dyn Any) -> &'a G::Value {
		value
			.downcast_ref::<G::Value>()
			.expect("element value type does not match its structure")
	}

	fn wrap(value: G::Value) -> ErasedValue {
		Arc::new(value)
	}
}

impl<G: GroupLaw> ErasedGroup for Erased<G> {
	fn neutral(&self) -> ErasedValue {
		Self::wrap(self.0.neutral())
	}

	fn op(&self, lhs: &dyn Any, rhs: &dyn Any) -> ErasedValue {
		Self::wrap(self.0.op(self.typed(lhs), self.typed(rhs)))
	}

	fn inv(&self, value: &dyn Any) -> ErasedValue {
		Self::wrap(self.0.inv(self.typed(value)))
	}

	fn pow(&self, value: &dyn Any, exponent: &BigInt) -> ErasedValue {
		Self::wrap(self.0.pow(self.typed(value), exponent))
	}

	fn size(&self) -> Option<BigUint> {
		self.0.size()
	}

	fn is_commutative(&self) -> bool {
		self.0.is_commutative()
	}

	fn random(&self, rng: &mut dyn RngCore) -> ErasedValue {
		Self::wrap(self.0.random(rng))
	}

	fn generator(&self) -> Result<ErasedValue, Error> {
		self.0.generator().map(Self::wrap)
	}

	fn normalize(&self, value: &dyn Any) -> Result<ErasedValue, Error> {
		let value = value
			.downcast_ref::<G::Value>()
			.ok_or_else(|| Error::StructureMismatch {
				structure: self.0.label(),
			})?;
		self.0.normalize(value.clone()).map(Self::wrap)
	}

	fn encode(&self, value: &dyn Any) -> Vec<u8> {
		self.0.encode(self.typed(value))
	}

	fn decode(&self, bytes: &[u8]) -> Result<ErasedValue, Error> {
		let value = self.0.decode(bytes)?;
		self.0.normalize(value).map(Self::wrap)
	}

	fn eq_values(&self, lhs: &dyn Any, rhs: &dyn Any) -> bool {
		self.typed(lhs) == self.typed(rhs)
	}

	fn hash_value(&self, value: &dyn Any, mut state: &mut dyn Hasher) {
		self.typed(value).hash(&mut state);
	}

	fn fmt_value(&self, value: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(self.typed(value), f)
	}

	fn as_any(&self) -> &dyn Any {
		&self.0
	}
}

/// A cheaply clonable handle to an algebraic group.
///
/// Equality and hashing go through the group label, so independently constructed handles for the
/// same mathematical group are interchangeable.
#[derive(Clone)]
pub struct Structure {
	label: Arc<str>,
	group: Arc<dyn ErasedGroup>,
}

impl Structure {
	pub fn new<G: GroupLaw>(group: G) -> Self {
		Self {
			label: group.label().into(),
			group: Arc::new(Erased(group)),
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn neutral_element(&self) -> Element {
		self.wrap(self.group.neutral())
	}

	/// The group order, or `None` when it is unknown.
	pub fn size(&self) -> Option<BigUint> {
		self.group.size()
	}

	pub fn is_commutative(&self) -> bool {
		self.group.is_commutative()
	}

	pub fn random_element<R: RngCore>(&self, rng: &mut R) -> Element {
		self.wrap(self.group.random(rng))
	}

	/// A generator, or [`Error::UnsupportedOperation`] for non-cyclic groups and groups of
	/// unknown order.
	pub fn generator(&self) -> Result<Element, Error> {
		self.group.generator().map(|value| self.wrap(value))
	}

	/// Wraps a typed value into an element of this structure, validating it first.
	pub fn element<V: Any + Send + Sync>(&self, value: V) -> Result<Element, Error> {
		self.group.normalize(&value).map(|value| self.wrap(value))
	}

	pub fn decode_element(&self, bytes: &[u8]) -> Result<Element, Error> {
		self.group.decode(bytes).map(|value| self.wrap(value))
	}

	/// Access to the concrete group law behind this handle.
	pub fn downcast<G: GroupLaw>(&self) -> Option<&G> {
		self.group.as_any().downcast_ref::<G>()
	}

	fn wrap(&self, value: ErasedValue) -> Element {
		Element {
			structure: self.clone(),
			value,
		}
	}
}

impl PartialEq for Structure {
	fn eq(&self, other: &Self) -> bool {
		self.label == other.label
	}
}

impl Eq for Structure {}

impl Hash for Structure {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.label.hash(state);
	}
}

impl Debug for Structure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Structure({})", self.label)
	}
}

impl Display for Structure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.label)
	}
}

/// An element of some [`Structure`].
///
/// Combining elements of different structures is a caller bug and panics.
#[derive(Clone)]
pub struct Element {
	structure: Structure,
	value: ErasedValue,
}

impl Element {
	pub fn structure(&self) -> &Structure {
		&self.structure
	}

	pub fn op(&self, other: &Element) -> Element {
		self.assert_same_structure(other);
		self.structure
			.wrap(self.structure.group.op(&*self.value, &*other.value))
	}

	pub fn inv(&self) -> Element {
		self.structure.wrap(self.structure.group.inv(&*self.value))
	}

	pub fn pow(&self, exponent: &BigInt) -> Element {
		self.structure
			.wrap(self.structure.group.pow(&*self.value, exponent))
	}

	pub fn square(&self) -> Element {
		self.op(self)
	}

	pub fn is_neutral(&self) -> bool {
		*self == self.structure.neutral_element()
	}

	pub fn encode(&self) -> Vec<u8> {
		self.structure.group.encode(&*self.value)
	}

	/// The typed value, if `V` is the value type of this element's structure.
	pub fn value<V: Any>(&self) -> Option<&V> {
		self.value.downcast_ref::<V>()
	}

	fn assert_same_structure(&self, other: &Element) {
		assert!(
			self.structure == other.structure,
			"cannot combine elements of {} and {}",
			self.structure,
			other.structure
		);
	}
}

impl PartialEq for Element {
	fn eq(&self, other: &Self) -> bool {
		self.structure == other.structure
			&& self
				.structure
				.group
				.eq_values(&*self.value, &*other.value)
	}
}

impl Eq for Element {}

impl Hash for Element {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.structure.hash(state);
		self.structure.group.hash_value(&*self.value, state);
	}
}

impl Debug for Element {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}(", self.structure.label)?;
		self.structure.group.fmt_value(&*self.value, f)?;
		f.write_str(")")
	}
}

impl Display for Element {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.structure.group.fmt_value(&*self.value, f)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use assert_matches::assert_matches;
	use num_bigint::BigUint;

	use super::*;
	use crate::groups::{Gl2Group, IntegerMulGroup};

	fn zp() -> Structure {
		Structure::new(IntegerMulGroup::prime(BigUint::from(101u32)))
	}

	#[test]
	fn test_structures_compare_by_label() {
		let a = zp();
		let b = zp();
		assert_eq!(a, b);
		let x = a.element(BigUint::from(5u32)).unwrap();
		let y = b.element(BigUint::from(5u32)).unwrap();
		assert_eq!(x, y);
		assert_eq!(HashSet::from([x.clone(), y]).len(), 1);
	}

	#[test]
	fn test_default_pow_matches_repeated_op() {
		let g = zp().element(BigUint::from(3u32)).unwrap();
		let mut expected = zp().neutral_element();
		for _ in 0..13 {
			expected = expected.op(&g);
		}
		assert_eq!(g.pow(&BigInt::from(13)), expected);
		assert_eq!(g.pow(&BigInt::from(-13)), expected.inv());
		assert!(g.pow(&BigInt::from(0)).is_neutral());
	}

	#[test]
	fn test_wrong_value_type_is_rejected() {
		assert_matches!(zp().element(5u64), Err(Error::StructureMismatch { .. }));
	}

	#[test]
	#[should_panic(expected = "cannot combine elements")]
	fn test_mixing_structures_panics() {
		let g = zp().element(BigUint::from(3u32)).unwrap();
		let m = Structure::new(Gl2Group::new(BigUint::from(7u32)).unwrap()).neutral_element();
		let _ = g.op(&m);
	}

	#[test]
	fn test_encoding_round_trip() {
		let g = zp().element(BigUint::from(77u32)).unwrap();
		assert_eq!(zp().decode_element(&g.encode()).unwrap(), g);
	}
}
