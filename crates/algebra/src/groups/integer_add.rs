// Copyright 2025 Irreducible Inc.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::RngCore;

use super::reduce_signed;
use crate::{Error, GroupLaw};

/// The additive group of integers modulo `n`, written multiplicatively: `op` is addition and
/// `pow` is scalar multiplication.
#[derive(Debug, Clone)]
pub struct IntegerAddGroup {
	modulus: BigUint,
}

impl IntegerAddGroup {
	pub fn new(modulus: BigUint) -> Self {
		assert!(!modulus.is_zero(), "modulus must be positive");
		Self { modulus }
	}

	pub fn modulus(&self) -> &BigUint {
		&self.modulus
	}
}

impl GroupLaw for IntegerAddGroup {
	type Value = BigUint;

	fn label(&self) -> String {
		format!("Zn+({})", self.modulus)
	}

	fn neutral(&self) -> BigUint {
		BigUint::zero()
	}

	fn op(&self, lhs: &BigUint, rhs: &BigUint) -> BigUint {
		(lhs + rhs) % &self.modulus
	}

	fn inv(&self, value: &BigUint) -> BigUint {
		(&self.modulus - value) % &self.modulus
	}

	fn pow(&self, value: &BigUint, exponent: &BigInt) -> BigUint {
		reduce_signed(&(BigInt::from(value.clone()) * exponent), &self.modulus)
	}

	fn size(&self) -> Option<BigUint> {
		Some(self.modulus.clone())
	}

	fn is_commutative(&self) -> bool {
		true
	}

	fn random(&self, rng: &mut dyn RngCore) -> BigUint {
		rng.gen_biguint_below(&self.modulus)
	}

	fn generator(&self) -> Result<BigUint, Error> {
		Ok(BigUint::one() % &self.modulus)
	}

	fn normalize(&self, value: BigUint) -> Result<BigUint, Error> {
		Ok(value % &self.modulus)
	}

	fn encode(&self, value: &BigUint) -> Vec<u8> {
		value.to_bytes_le()
	}

	fn decode(&self, bytes: &[u8]) -> Result<BigUint, Error> {
		let value = BigUint::from_bytes_le(bytes);
		if value >= self.modulus {
			return Err(Error::InvalidEncoding {
				structure: self.label(),
				reason: "value exceeds the modulus".into(),
			});
		}
		Ok(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pow_is_scalar_multiplication() {
		let group = IntegerAddGroup::new(BigUint::from(1019u32));
		let x = BigUint::from(500u32);
		assert_eq!(group.pow(&x, &BigInt::from(3)), BigUint::from(1500u32 - 1019));
		assert_eq!(group.pow(&x, &BigInt::from(-1)), group.inv(&x));
		assert_eq!(group.inv(&BigUint::zero()), BigUint::zero());
	}
}
