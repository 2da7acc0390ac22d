// Copyright 2025 Irreducible Inc.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use super::{IntegerAddGroup, IntegerMulGroup};
use crate::{BilinearMap, Element, Error, Structure};

/// A symmetric bilinear map over discrete-log representations.
///
/// The source group is `Z_q` under addition, standing for the exponents of a generator `g`; the
/// target group is the order-`q` subgroup of `Z_p^*` generated by `g`, and
/// `e(a, b) = g^(a*b)`. Discrete logarithms in the source group are trivial, so this is a test
/// fixture with the algebraic behaviour of a pairing and none of its hardness.
#[derive(Debug, Clone)]
pub struct ExponentPairing {
	source: Structure,
	target: Structure,
	generator: BigUint,
	modulus: BigUint,
}

impl ExponentPairing {
	pub fn new(p: BigUint, q: BigUint, generator: BigUint) -> Result<Self, Error> {
		if q.is_zero() || !((&p - 1u32) % &q).is_zero() {
			return Err(Error::InvalidParameters(format!("{q} does not divide {p} - 1")));
		}
		if (&generator % &p).is_one() {
			return Err(Error::InvalidParameters("generator must not be 1".into()));
		}
		let target = IntegerMulGroup::subgroup(p.clone(), generator.clone(), q.clone())?;
		Ok(Self {
			source: Structure::new(IntegerAddGroup::new(q)),
			target: Structure::new(target),
			generator,
			modulus: p,
		})
	}

	/// Parameters `p = 2039 = 2q + 1`, `q = 1019`, `g = 4`.
	pub fn toy() -> Self {
		Self::new(BigUint::from(2039u32), BigUint::from(1019u32), BigUint::from(4u32))
			.expect("toy parameters are valid")
	}
}

impl BilinearMap for ExponentPairing {
	fn label(&self) -> String {
		format!("e[{} -> {}]", self.source.label(), self.target.label())
	}

	fn g1(&self) -> Structure {
		self.source.clone()
	}

	fn g2(&self) -> Structure {
		self.source.clone()
	}

	fn gt(&self) -> Structure {
		self.target.clone()
	}

	fn apply(&self, lhs: &Element, rhs: &Element) -> Element {
		let a = lhs.value::<BigUint>().expect("source elements are integers");
		let b = rhs.value::<BigUint>().expect("source elements are integers");
		let value = self.generator.modpow(&(a * b), &self.modulus);
		self.target
			.element(value)
			.expect("powers of the generator are units")
	}

	fn is_symmetric(&self) -> bool {
		true
	}
}

#[cfg(test)]
mod tests {
	use num_bigint::BigInt;

	use super::*;
	use crate::Pairing;

	#[test]
	fn test_bilinearity() {
		let e = Pairing::new(ExponentPairing::toy());
		let g1 = e.g1();
		let a = g1.element(BigUint::from(17u32)).unwrap();
		let b = g1.element(BigUint::from(400u32)).unwrap();
		let k = BigInt::from(-5);

		assert_eq!(e.apply(&a.pow(&k), &b), e.apply(&a, &b).pow(&k));
		assert_eq!(e.apply(&a, &b.pow(&k)), e.apply(&a, &b).pow(&k));
		let c = g1.element(BigUint::from(3u32)).unwrap();
		assert_eq!(e.apply(&a.op(&c), &b), e.apply(&a, &b).op(&e.apply(&c, &b)));
		assert_eq!(e.apply(&a, &b), e.apply(&b, &a));
	}

	#[test]
	fn test_rejects_bad_parameters() {
		assert!(
			ExponentPairing::new(BigUint::from(2039u32), BigUint::from(7u32), BigUint::from(4u32))
				.is_err()
		);
	}
}
