// Copyright 2025 Irreducible Inc.

use algebrix_algebra::Element;
use algebrix_utils::ensure;
use num_bigint::BigUint;

use crate::{
	digits::bits_at, simultaneous_chunk_size, Error, MultiExpContext, PrecomputationCache,
	MAX_POWER_PRODUCT_TABLE_BITS,
};

/// The dense table `T[i] = ∏_j bases[j]^(digit_j(i))`, where `digit_j(i)` is the `j`-th
/// `window`-bit digit of `i`.
///
/// Every entry is one multiplication away from an entry with a smaller index.
pub fn compute_power_products(bases: &[Element], window: usize) -> Result<Vec<Element>, Error> {
	assert!(!bases.is_empty(), "power-product table needs at least one base");
	let bits = window * bases.len();
	ensure!(
		window > 0 && bits <= MAX_POWER_PRODUCT_TABLE_BITS,
		Error::TableTooLarge {
			bases: bases.len(),
			window,
			max_bits: MAX_POWER_PRODUCT_TABLE_BITS,
		}
	);

	let size = 1usize << bits;
	let mut table = Vec::with_capacity(size);
	table.push(bases[0].structure().neutral_element());
	for index in 1..size {
		let digit = index.trailing_zeros() as usize / window;
		let entry = table[index - (1 << (digit * window))].op(&bases[digit]);
		table.push(entry);
	}
	Ok(table)
}

/// Simultaneous w-ary exponentiation.
///
/// Bases are processed in chunks small enough for their power-product table to respect the table
/// bound; chunk results are multiplied together. Tables stored in `cache` are reused, missing ones
/// are built for this call only.
pub fn simultaneous(
	context: &MultiExpContext,
	window: usize,
	cache: Option<&PrecomputationCache>,
) -> Result<Element, Error> {
	ensure!(
		(1..=MAX_POWER_PRODUCT_TABLE_BITS).contains(&window),
		Error::InvalidConfig(format!("simultaneous window {window} out of range"))
	);

	let mut result = context.structure().neutral_element();
	for chunk in context.unsigned_terms().chunks(simultaneous_chunk_size(window)) {
		let (bases, exponents): (Vec<Element>, Vec<BigUint>) = chunk.iter().cloned().unzip();
		let table = match cache.map(|cache| cache.get_power_products(&bases, window, false)) {
			Some(Ok(table)) => table,
			_ => compute_power_products(&bases, window)?.into(),
		};
		result = result.op(&evaluate_chunk(&table, &exponents, window));
	}
	Ok(result)
}

fn evaluate_chunk(table: &[Element], exponents: &[BigUint], window: usize) -> Element {
	let bits = exponents.iter().map(BigUint::bits).max().unwrap_or(0);
	let digits = bits.div_ceil(window as u64);

	let mut acc = table[0].clone();
	for position in (0..digits).rev() {
		for _ in 0..window {
			acc = acc.square();
		}
		let index = exponents
			.iter()
			.enumerate()
			.fold(0usize, |index, (j, exponent)| {
				index | (bits_at(exponent, position * window as u64, window) << (j * window))
			});
		if index != 0 {
			acc = acc.op(&table[index]);
		}
	}
	acc
}

#[cfg(test)]
mod tests {
	use algebrix_algebra::{groups::IntegerMulGroup, Structure};
	use num_bigint::{BigInt, BigUint};

	use super::*;

	#[test]
	fn test_chunks_use_stored_tables_only() {
		let structure = Structure::new(IntegerMulGroup::prime(BigUint::from(1_000_003u32)));
		let bases = (2..9u32)
			.map(|value| structure.element(BigUint::from(value)).unwrap())
			.collect::<Vec<_>>();
		let context = MultiExpContext::from_terms(
			structure.clone(),
			bases
				.iter()
				.enumerate()
				.map(|(i, base)| (base.clone(), BigInt::from(1000 * i + 7))),
		);
		let expected = context
			.terms()
			.iter()
			.fold(structure.neutral_element(), |acc, term| acc.op(&term.base.pow(&term.exponent)));

		// window 5 splits the seven bases into chunks of 3, 3 and 1
		assert_eq!(simultaneous_chunk_size(5), 3);
		let cache = PrecomputationCache::new();
		assert_eq!(simultaneous(&context, 5, Some(&cache)).unwrap(), expected);
		assert!(cache.snapshot().is_empty());

		cache.get_power_products(&bases[..3], 5, true).unwrap();
		assert_eq!(simultaneous(&context, 5, Some(&cache)).unwrap(), expected);
		assert_eq!(cache.snapshot().structures()[0].power_products.len(), 1);
	}
}
