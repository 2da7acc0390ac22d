// Copyright 2025 Irreducible Inc.

use algebrix_algebra::Element;
use tracing::trace;

use crate::{MultiExpContext, PrecomputationCache};

/// Computes every power separately and multiplies them together.
///
/// With a cache, stored powers are used where present; nothing is added to the cache.
pub fn naive(context: &MultiExpContext, cache: Option<&PrecomputationCache>) -> Element {
	context
		.terms()
		.iter()
		.map(|term| match cache.and_then(|cache| cache.get_power(&term.base, &term.exponent)) {
			Some(power) => {
				trace!(base = %term.base, "power cache hit");
				power
			}
			None => term.base.pow(&term.exponent),
		})
		.fold(context.structure().neutral_element(), |acc, power| acc.op(&power))
}
