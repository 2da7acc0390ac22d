// Copyright 2025 Irreducible Inc.

use algebrix_algebra::Element;

use crate::MultiExpContext;

/// Interleaved square-and-multiply: one shared squaring chain, one multiplication per set bit.
pub fn interleaved(context: &MultiExpContext) -> Element {
	let terms = context.unsigned_terms();
	let bits = terms
		.iter()
		.map(|(_, exponent)| exponent.bits())
		.max()
		.unwrap_or(0);

	let mut acc = context.structure().neutral_element();
	for i in (0..bits).rev() {
		acc = acc.square();
		for (base, exponent) in &terms {
			if exponent.bit(i) {
				acc = acc.op(base);
			}
		}
	}
	acc
}
