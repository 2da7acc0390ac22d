// Copyright 2025 Irreducible Inc.

use algebrix_algebra::Element;
use algebrix_utils::ensure;
use itertools::izip;

use super::odd_power_table;
use crate::{
	digits::{sliding_window_at, SlidingWindow},
	Error, MultiExpContext, PrecomputationCache, MAX_ODD_POWER_WINDOW,
};

/// Interleaved sliding-window exponentiation.
///
/// Each base keeps its own window state; a window opens at a set bit, spans at most `window`
/// bits ending in a set bit, and is multiplied in once the squaring chain reaches its lowest bit.
pub fn interleaved_sliding(
	context: &MultiExpContext,
	window: usize,
	cache: Option<&PrecomputationCache>,
) -> Result<Element, Error> {
	ensure!(
		(1..=MAX_ODD_POWER_WINDOW).contains(&window),
		Error::InvalidConfig(format!("sliding window {window} out of range"))
	);

	let terms = context.unsigned_terms();
	let tables = terms
		.iter()
		.map(|(base, _)| odd_power_table(base, window, cache))
		.collect::<Vec<_>>();
	let bits = terms
		.iter()
		.map(|(_, exponent)| exponent.bits())
		.max()
		.unwrap_or(0);

	let mut open = vec![None::<SlidingWindow>; terms.len()];
	let mut acc = context.structure().neutral_element();
	for i in (0..bits).rev() {
		acc = acc.square();
		for ((_, exponent), table, state) in izip!(&terms, &tables, &mut open) {
			if state.is_none() && exponent.bit(i) {
				*state = Some(sliding_window_at(exponent, i, window));
			}
			if let Some(current) = *state {
				if current.low == i {
					acc = acc.op(&table[current.value >> 1]);
					*state = None;
				}
			}
		}
	}
	Ok(acc)
}
