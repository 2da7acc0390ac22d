// Copyright 2025 Irreducible Inc.

//! Reference structures for exercising the expression engine.

mod exponent_pairing;
mod gl2;
mod integer_add;
mod integer_mul;

pub use exponent_pairing::ExponentPairing;
pub use gl2::{Gl2Group, Gl2Matrix};
pub use integer_add::IntegerAddGroup;
pub use integer_mul::IntegerMulGroup;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;

/// Reduces a signed integer into `[0, modulus)`.
pub(crate) fn reduce_signed(value: &BigInt, modulus: &BigUint) -> BigUint {
	let modulus = BigInt::from(modulus.clone());
	value
		.mod_floor(&modulus)
		.to_biguint()
		.expect("mod_floor by a positive modulus is non-negative")
}
