// Copyright 2025 Irreducible Inc.

use std::collections::HashMap;

use algebrix_algebra::{Element, Structure};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{Signed, Zero};

/// One factor `base^exponent` of a multi-exponentiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiExpTerm {
	pub base: Element,
	pub exponent: BigInt,
}

/// The terms of a product `∏ base_i^exponent_i` over a single structure.
///
/// The product is evaluated in an arbitrary order, so contexts are only meaningful over
/// commutative structures.
#[derive(Debug, Clone)]
pub struct MultiExpContext {
	structure: Structure,
	terms: Vec<MultiExpTerm>,
}

impl MultiExpContext {
	pub fn new(structure: Structure) -> Self {
		Self {
			structure,
			terms: Vec::new(),
		}
	}

	pub fn from_terms(
		structure: Structure,
		terms: impl IntoIterator<Item = (Element, BigInt)>,
	) -> Self {
		let mut context = Self::new(structure);
		for (base, exponent) in terms {
			context.push(base, exponent);
		}
		context
	}

	/// Appends `base^exponent`.
	///
	/// Panics if `base` does not belong to the context's structure.
	pub fn push(&mut self, base: Element, exponent: BigInt) {
		assert_eq!(
			base.structure(),
			&self.structure,
			"multi-exponentiation terms must share one structure"
		);
		self.terms.push(MultiExpTerm { base, exponent });
	}

	/// Appends all terms of `other`, which must be over the same structure.
	pub fn extend(&mut self, other: MultiExpContext) {
		assert_eq!(self.structure, other.structure);
		self.terms.extend(other.terms);
	}

	pub fn structure(&self) -> &Structure {
		&self.structure
	}

	pub fn terms(&self) -> &[MultiExpTerm] {
		&self.terms
	}

	pub fn len(&self) -> usize {
		self.terms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}

	/// Merges repeated bases, drops neutral bases and zero exponents, and reduces exponents that
	/// reach the group order into the symmetric range `(-n/2, n/2]`.
	///
	/// First-occurrence order of the bases is preserved.
	pub fn normalized(&self) -> MultiExpContext {
		let order = self.structure.size();
		let mut positions = HashMap::<&Element, usize>::new();
		let mut merged = Vec::<MultiExpTerm>::with_capacity(self.terms.len());
		for term in &self.terms {
			match positions.get(&term.base) {
				Some(&index) => merged[index].exponent += &term.exponent,
				None => {
					positions.insert(&term.base, merged.len());
					merged.push(term.clone());
				}
			}
		}

		let terms = merged
			.into_iter()
			.filter_map(|mut term| {
				if let Some(order) = &order {
					term.exponent = reduce_exponent(&term.exponent, order);
				}
				(!term.exponent.is_zero() && !term.base.is_neutral()).then_some(term)
			})
			.collect();

		MultiExpContext {
			structure: self.structure.clone(),
			terms,
		}
	}

	/// The terms with signs folded into the bases: `(b, -e)` becomes `(b^-1, e)`.
	pub fn unsigned_terms(&self) -> Vec<(Element, BigUint)> {
		self.terms
			.iter()
			.map(|term| {
				let base = if term.exponent.is_negative() {
					term.base.inv()
				} else {
					term.base.clone()
				};
				(base, term.exponent.magnitude().clone())
			})
			.collect()
	}
}

fn reduce_exponent(exponent: &BigInt, order: &BigUint) -> BigInt {
	let order = BigInt::from(order.clone());
	if exponent.abs() < order {
		return exponent.clone();
	}
	let reduced = exponent.mod_floor(&order);
	if &reduced + &reduced > order {
		reduced - order
	} else {
		reduced
	}
}

#[cfg(test)]
mod tests {
	use algebrix_algebra::groups::IntegerMulGroup;

	use super::*;

	fn z101() -> Structure {
		Structure::new(IntegerMulGroup::prime(BigUint::from(101u32)))
	}

	#[test]
	fn test_normalized_merges_and_reduces() {
		let zp = z101();
		let g = zp.element(BigUint::from(2u32)).unwrap();
		let h = zp.element(BigUint::from(3u32)).unwrap();
		let context = MultiExpContext::from_terms(
			zp.clone(),
			[
				(g.clone(), BigInt::from(5)),
				(h.clone(), BigInt::from(0)),
				(g.clone(), BigInt::from(-5)),
				(h.clone(), BigInt::from(199)),
				(zp.neutral_element(), BigInt::from(7)),
			],
		);
		let normalized = context.normalized();
		assert_eq!(normalized.len(), 1);
		assert_eq!(normalized.terms()[0].base, h);
		assert_eq!(normalized.terms()[0].exponent, BigInt::from(-1));
	}

	#[test]
	fn test_unsigned_terms_fold_signs() {
		let zp = z101();
		let g = zp.element(BigUint::from(2u32)).unwrap();
		let context = MultiExpContext::from_terms(zp, [(g.clone(), BigInt::from(-3))]);
		assert_eq!(context.unsigned_terms(), vec![(g.inv(), BigUint::from(3u32))]);
	}

	#[test]
	#[should_panic(expected = "share one structure")]
	fn test_push_foreign_base_panics() {
		let other = Structure::new(IntegerMulGroup::prime(BigUint::from(103u32)));
		let mut context = MultiExpContext::new(z101());
		context.push(other.neutral_element(), BigInt::from(1));
	}
}
