// Copyright 2025 Irreducible Inc.

//! Digit expansions of exponents used by the windowed algorithms.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// Reads `width` bits of `value` starting at bit `offset`, least significant first.
pub fn bits_at(value: &BigUint, offset: u64, width: usize) -> usize {
	(0..width as u64)
		.filter(|&i| value.bit(offset + i))
		.fold(0usize, |acc, i| acc | (1 << i))
}

/// A sliding window of an exponent: the bits `low..=high` read as an odd integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindow {
	pub low: u64,
	pub value: usize,
}

/// The longest window of at most `window` bits whose top bit is `high` and whose lowest bit is
/// set. Bit `high` of `value` must be set.
pub fn sliding_window_at(value: &BigUint, high: u64, window: usize) -> SlidingWindow {
	debug_assert!(value.bit(high));
	let mut low = (high + 1).saturating_sub(window as u64);
	while !value.bit(low) {
		low += 1;
	}
	let value = bits_at(value, low, (high - low + 1) as usize);
	SlidingWindow { low, value }
}

/// The width-`(window + 1)` non-adjacent form of `value`, least significant digit first.
///
/// Every digit is zero or odd with absolute value at most `2^window - 1`, any non-zero digit is
/// followed by at least `window` zero digits, and `Σ digit_i 2^i == value`.
pub fn wnaf_digits(value: &BigUint, window: usize) -> Vec<i64> {
	assert!((1..=32).contains(&window), "wNAF window must be within 1..=32");
	let radix = 1u64 << (window + 1);
	let half = 1u64 << window;
	let mut k = value.clone();
	let mut digits = Vec::with_capacity(value.bits() as usize + 1);
	while !k.is_zero() {
		let mut digit = 0i64;
		if k.bit(0) {
			let low = (&k % radix)
				.to_u64()
				.expect("remainder is below the radix");
			if low >= half {
				digit = low as i64 - radix as i64;
				k += radix - low;
			} else {
				digit = low as i64;
				k -= low;
			}
		}
		digits.push(digit);
		k >>= 1;
	}
	digits
}

#[cfg(test)]
mod tests {
	use num_bigint::BigInt;
	use proptest::prelude::*;

	use super::*;

	fn recompose(digits: &[i64]) -> BigInt {
		digits
			.iter()
			.rev()
			.fold(BigInt::zero(), |acc, &d| (acc << 1) + BigInt::from(d))
	}

	#[test]
	fn test_bits_at() {
		let value = BigUint::from(0b1011_0110u32);
		assert_eq!(bits_at(&value, 0, 4), 0b0110);
		assert_eq!(bits_at(&value, 4, 4), 0b1011);
		assert_eq!(bits_at(&value, 6, 4), 0b10);
	}

	#[test]
	fn test_sliding_window_skips_trailing_zeros() {
		let value = BigUint::from(0b1_0100u32);
		assert_eq!(sliding_window_at(&value, 4, 4), SlidingWindow { low: 2, value: 0b101 });
		assert_eq!(sliding_window_at(&value, 4, 1), SlidingWindow { low: 4, value: 1 });
	}

	#[test]
	fn test_wnaf_small() {
		// 7 = 8 - 1 in NAF
		assert_eq!(wnaf_digits(&BigUint::from(7u32), 1), vec![-1, 0, 0, 1]);
		assert!(wnaf_digits(&BigUint::zero(), 3).is_empty());
	}

	proptest! {
		#[test]
		fn test_wnaf_properties(bytes in proptest::collection::vec(any::<u8>(), 0..40), window in 1usize..8) {
			let value = BigUint::from_bytes_le(&bytes);
			let digits = wnaf_digits(&value, window);
			prop_assert_eq!(recompose(&digits), BigInt::from(value));
			let bound = (1i64 << window) - 1;
			for (i, &d) in digits.iter().enumerate() {
				if d != 0 {
					prop_assert!(d % 2 != 0 && d.abs() <= bound);
					for &next in digits.iter().skip(i + 1).take(window) {
						prop_assert_eq!(next, 0);
					}
				}
			}
		}
	}
}
