// Copyright 2025 Irreducible Inc.

use std::fmt::{self, Display};

use algebrix_utils::serialization::{read_bytes, write_bytes};
use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero;
use rand::RngCore;

use crate::{Error, GroupLaw};

/// A 2x2 matrix `[[a, b], [c, d]]` with entries reduced modulo the group's prime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gl2Matrix(pub [BigUint; 4]);

impl Display for Gl2Matrix {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [a, b, c, d] = &self.0;
		write!(f, "[[{a}, {b}], [{c}, {d}]]")
	}
}

/// The general linear group GL(2, p) of invertible 2x2 matrices over the prime field `F_p`.
///
/// This is the reference non-commutative structure: rewrites that reorder factors must never
/// apply to it.
#[derive(Debug, Clone)]
pub struct Gl2Group {
	p: BigUint,
}

impl Gl2Group {
	pub fn new(p: BigUint) -> Result<Self, Error> {
		if p < BigUint::from(2u32) {
			return Err(Error::InvalidParameters(format!("{p} is not a prime")));
		}
		Ok(Self { p })
	}

	pub fn matrix(a: u64, b: u64, c: u64, d: u64) -> Gl2Matrix {
		Gl2Matrix([a, b, c, d].map(BigUint::from))
	}

	fn det(&self, m: &Gl2Matrix) -> BigUint {
		let [a, b, c, d] = &m.0;
		let ad = (a * d) % &self.p;
		let bc = (b * c) % &self.p;
		(ad + &self.p - bc) % &self.p
	}
}

impl GroupLaw for Gl2Group {
	type Value = Gl2Matrix;

	fn label(&self) -> String {
		format!("GL2({})", self.p)
	}

	fn neutral(&self) -> Gl2Matrix {
		Self::matrix(1, 0, 0, 1)
	}

	fn op(&self, lhs: &Gl2Matrix, rhs: &Gl2Matrix) -> Gl2Matrix {
		let [a, b, c, d] = &lhs.0;
		let [e, f, g, h] = &rhs.0;
		let p = &self.p;
		Gl2Matrix([
			(a * e + b * g) % p,
			(a * f + b * h) % p,
			(c * e + d * g) % p,
			(c * f + d * h) % p,
		])
	}

	fn inv(&self, value: &Gl2Matrix) -> Gl2Matrix {
		let det_inv = self
			.det(value)
			.modinv(&self.p)
			.expect("group elements have non-zero determinant");
		let [a, b, c, d] = &value.0;
		let p = &self.p;
		let neg = |x: &BigUint| (p - x) % p;
		Gl2Matrix([
			(d * &det_inv) % p,
			(neg(b) * &det_inv) % p,
			(neg(c) * &det_inv) % p,
			(a * &det_inv) % p,
		])
	}

	fn size(&self) -> Option<BigUint> {
		let p2 = &self.p * &self.p;
		Some((&p2 - 1u32) * (&p2 - &self.p))
	}

	fn is_commutative(&self) -> bool {
		false
	}

	fn random(&self, rng: &mut dyn RngCore) -> Gl2Matrix {
		loop {
			let m = Gl2Matrix(std::array::from_fn(|_| rng.gen_biguint_below(&self.p)));
			if !self.det(&m).is_zero() {
				break m;
			}
		}
	}

	fn normalize(&self, value: Gl2Matrix) -> Result<Gl2Matrix, Error> {
		let m = Gl2Matrix(value.0.map(|x| x % &self.p));
		if self.det(&m).is_zero() {
			return Err(Error::InvalidElement {
				structure: self.label(),
				value: m.to_string(),
			});
		}
		Ok(m)
	}

	fn encode(&self, value: &Gl2Matrix) -> Vec<u8> {
		let mut buf = Vec::new();
		for entry in &value.0 {
			write_bytes(&entry.to_bytes_le(), &mut buf)
				.expect("writing to a Vec cannot run out of space");
		}
		buf
	}

	fn decode(&self, bytes: &[u8]) -> Result<Gl2Matrix, Error> {
		let mut buf = bytes;
		let mut entries = Vec::with_capacity(4);
		for _ in 0..4 {
			entries.push(BigUint::from_bytes_le(&read_bytes(&mut buf)?));
		}
		let entries: [BigUint; 4] = entries
			.try_into()
			.expect("exactly four entries were read");
		if entries.iter().any(|x| x >= &self.p) || !buf.is_empty() {
			return Err(Error::InvalidEncoding {
				structure: self.label(),
				reason: "malformed matrix entries".into(),
			});
		}
		Ok(Gl2Matrix(entries))
	}
}

#[cfg(test)]
mod tests {
	use num_bigint::BigInt;

	use super::*;

	#[test]
	fn test_non_commutative() {
		let group = Gl2Group::new(BigUint::from(7u32)).unwrap();
		let x = Gl2Group::matrix(1, 1, 0, 1);
		let y = Gl2Group::matrix(1, 0, 1, 1);
		assert_ne!(group.op(&x, &y), group.op(&y, &x));
	}

	#[test]
	fn test_inverse() {
		let group = Gl2Group::new(BigUint::from(11u32)).unwrap();
		let x = Gl2Group::matrix(2, 3, 5, 7);
		assert_eq!(group.op(&x, &group.inv(&x)), group.neutral());
		assert_eq!(group.pow(&x, &BigInt::from(-3)), group.inv(&group.pow(&x, &BigInt::from(3))));
	}

	#[test]
	fn test_encoding_round_trip() {
		let group = Gl2Group::new(BigUint::from(11u32)).unwrap();
		let x = Gl2Group::matrix(2, 3, 5, 10);
		assert_eq!(group.decode(&group.encode(&x)).unwrap(), x);
	}
}
