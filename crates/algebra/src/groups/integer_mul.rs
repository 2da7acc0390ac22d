// Copyright 2025 Irreducible Inc.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::RngCore;

use crate::{Error, GroupLaw};

/// The multiplicative group of units modulo `n`, or a subgroup of it of known order.
#[derive(Debug, Clone)]
pub struct IntegerMulGroup {
	modulus: BigUint,
	order: Option<BigUint>,
	generator: Option<BigUint>,
}

impl IntegerMulGroup {
	/// The full unit group modulo `modulus`, of unknown order.
	pub fn new(modulus: BigUint) -> Self {
		assert!(modulus > BigUint::one(), "modulus must be at least 2");
		Self {
			modulus,
			order: None,
			generator: None,
		}
	}

	/// The unit group modulo a prime `p`, of order `p - 1`.
	pub fn prime(p: BigUint) -> Self {
		let order = &p - 1u32;
		Self {
			order: Some(order),
			..Self::new(p)
		}
	}

	/// The cyclic subgroup generated by `generator`, whose order is `order`.
	pub fn subgroup(modulus: BigUint, generator: BigUint, order: BigUint) -> Result<Self, Error> {
		let group = Self::new(modulus);
		let generator = group.normalize(generator)?;
		if generator.modpow(&order, &group.modulus) != BigUint::one() {
			return Err(Error::InvalidParameters(format!(
				"{generator} does not have order dividing {order}"
			)));
		}
		Ok(Self {
			order: Some(order),
			generator: Some(generator),
			..group
		})
	}

	pub fn modulus(&self) -> &BigUint {
		&self.modulus
	}
}

impl GroupLaw for IntegerMulGroup {
	type Value = BigUint;

	fn label(&self) -> String {
		match &self.order {
			Some(order) => format!("Zn*({})[{}]", self.modulus, order),
			None => format!("Zn*({})", self.modulus),
		}
	}

	fn neutral(&self) -> BigUint {
		BigUint::one()
	}

	fn op(&self, lhs: &BigUint, rhs: &BigUint) -> BigUint {
		(lhs * rhs) % &self.modulus
	}

	fn inv(&self, value: &BigUint) -> BigUint {
		value
			.modinv(&self.modulus)
			.expect("group elements are units modulo n")
	}

	fn pow(&self, value: &BigUint, exponent: &BigInt) -> BigUint {
		let base = if exponent.is_negative() {
			self.inv(value)
		} else {
			value.clone()
		};
		base.modpow(exponent.magnitude(), &self.modulus)
	}

	fn size(&self) -> Option<BigUint> {
		self.order.clone()
	}

	fn is_commutative(&self) -> bool {
		true
	}

	fn random(&self, rng: &mut dyn RngCore) -> BigUint {
		match (&self.generator, &self.order) {
			(Some(generator), Some(order)) => {
				let exponent = rng.gen_biguint_below(order);
				generator.modpow(&exponent, &self.modulus)
			}
			_ => loop {
				let candidate = rng.gen_biguint_range(&BigUint::one(), &self.modulus);
				if candidate.gcd(&self.modulus).is_one() {
					break candidate;
				}
			},
		}
	}

	fn generator(&self) -> Result<BigUint, Error> {
		self.generator
			.clone()
			.ok_or_else(|| Error::UnsupportedOperation {
				structure: self.label(),
				operation: "generator",
			})
	}

	/// Reduces modulo `n` and rejects non-units. In a generated subgroup, also rejects units
	/// whose order does not divide the subgroup order.
	fn normalize(&self, value: BigUint) -> Result<BigUint, Error> {
		let value = value % &self.modulus;
		let invalid = || Error::InvalidElement {
			structure: self.label(),
			value: value.to_string(),
		};
		if value.is_zero() || !value.gcd(&self.modulus).is_one() {
			return Err(invalid());
		}
		if let (Some(_), Some(order)) = (&self.generator, &self.order) {
			if !value.modpow(order, &self.modulus).is_one() {
				return Err(invalid());
			}
		}
		Ok(value)
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
		self.normalize(value)
	}
}
