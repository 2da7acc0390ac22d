// Copyright 2025 Irreducible Inc.

use std::sync::Arc;

use algebrix_algebra::Element;
use algebrix_utils::ensure;
use num_traits::Signed;

use super::odd_power_table;
use crate::{digits::wnaf_digits, Error, MultiExpContext, PrecomputationCache, MAX_ODD_POWER_WINDOW};

struct WnafTerm {
	digits: Vec<i64>,
	odd_powers: Arc<[Element]>,
	inverted: Vec<Element>,
}

/// Interleaved exponentiation over width-`(window + 1)` non-adjacent forms.
///
/// Negative digits multiply by inverted odd powers, so the sign of each exponent is carried by
/// its digits rather than by inverting the base.
pub fn interleaved_wnaf(
	context: &MultiExpContext,
	window: usize,
	cache: Option<&PrecomputationCache>,
) -> Result<Element, Error> {
	ensure!(
		(1..=MAX_ODD_POWER_WINDOW).contains(&window),
		Error::InvalidConfig(format!("wNAF window {window} out of range"))
	);

	let terms = context
		.terms()
		.iter()
		.map(|term| {
			let mut digits = wnaf_digits(term.exponent.magnitude(), window);
			if term.exponent.is_negative() {
				digits.iter_mut().for_each(|digit| *digit = -*digit);
			}
			let odd_powers = odd_power_table(&term.base, window, cache);
			let inverted = if digits.iter().any(|&digit| digit < 0) {
				odd_powers.iter().map(Element::inv).collect()
			} else {
				Vec::new()
			};
			WnafTerm {
				digits,
				odd_powers,
				inverted,
			}
		})
		.collect::<Vec<_>>();

	let len = terms.iter().map(|term| term.digits.len()).max().unwrap_or(0);
	let mut acc = context.structure().neutral_element();
	for i in (0..len).rev() {
		acc = acc.square();
		for term in &terms {
			match term.digits.get(i).copied().unwrap_or(0) {
				0 => {}
				digit if digit > 0 => acc = acc.op(&term.odd_powers[(digit >> 1) as usize]),
				digit => acc = acc.op(&term.inverted[(-digit >> 1) as usize]),
			}
		}
	}
	Ok(acc)
}
