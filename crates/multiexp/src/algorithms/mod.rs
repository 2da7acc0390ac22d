// Copyright 2025 Irreducible Inc.

mod interleaved;
mod naive;
mod simultaneous;
mod sliding;
mod wnaf;

use std::{
	fmt::{self, Display},
	str::FromStr,
	sync::Arc,
};

use algebrix_algebra::Element;
pub use interleaved::interleaved;
pub use naive::naive;
pub use simultaneous::{compute_power_products, simultaneous};
pub use sliding::interleaved_sliding;
use tracing::{debug, instrument};
pub use wnaf::interleaved_wnaf;

use crate::{cache::extend_odd_powers, Error, MultiExpConfig, MultiExpContext, PrecomputationCache};

/// The multi-exponentiation algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiExpAlgorithm {
	/// Simultaneous w-ary exponentiation over a dense table of power products.
	Simultaneous,
	/// Interleaved sliding-window exponentiation over odd-power tables.
	InterleavedSliding,
	/// Interleaved signed-window (wNAF) exponentiation over odd-power tables.
	InterleavedWnaf,
	/// Interleaved square-and-multiply without tables.
	Interleaved,
	/// One exponentiation per term followed by the product.
	Naive,
}

impl MultiExpAlgorithm {
	pub const ALL: [Self; 5] = [
		Self::Simultaneous,
		Self::InterleavedSliding,
		Self::InterleavedWnaf,
		Self::Interleaved,
		Self::Naive,
	];

	pub const fn name(self) -> &'static str {
		match self {
			Self::Simultaneous => "simultaneous",
			Self::InterleavedSliding => "sliding",
			Self::InterleavedWnaf => "wnaf",
			Self::Interleaved => "interleaved",
			Self::Naive => "naive",
		}
	}

	/// Picks the algorithm for a normalized context according to `config`.
	pub fn select(context: &MultiExpContext, config: &MultiExpConfig, has_cache: bool) -> Self {
		if let Some(algorithm) = config.forced_algorithm() {
			return algorithm;
		}
		let caching = config.precompute() && has_cache;
		if context.len() == 1 && !caching {
			Self::Naive
		} else if config.precompute() && context.len() <= config.cache_base_threshold() {
			Self::InterleavedWnaf
		} else {
			Self::Interleaved
		}
	}
}

impl Display for MultiExpAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for MultiExpAlgorithm {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
			.ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
	}
}

/// Evaluates `∏ base_i^exponent_i`.
///
/// The context is normalized first. The cache is consulted only when precomputation is enabled
/// in `config`.
#[instrument(
	skip_all,
	level = "debug",
	fields(structure = %context.structure(), terms = context.len())
)]
pub fn multiexp(
	context: &MultiExpContext,
	cache: Option<&PrecomputationCache>,
	config: &MultiExpConfig,
) -> Result<Element, Error> {
	let context = context.normalized();
	if context.is_empty() {
		return Ok(context.structure().neutral_element());
	}

	let cache = cache.filter(|_| config.precompute());
	let algorithm = MultiExpAlgorithm::select(&context, config, cache.is_some());
	debug!(%algorithm, bases = context.len(), "dispatching multi-exponentiation");

	run(algorithm, &context, cache, config)
}

/// Evaluates a context with a specific algorithm and the window sizes of `config`.
pub fn run(
	algorithm: MultiExpAlgorithm,
	context: &MultiExpContext,
	cache: Option<&PrecomputationCache>,
	config: &MultiExpConfig,
) -> Result<Element, Error> {
	match algorithm {
		MultiExpAlgorithm::Simultaneous => {
			simultaneous(context, config.simultaneous_window(), cache)
		}
		MultiExpAlgorithm::InterleavedSliding => {
			interleaved_sliding(context, config.sliding_window(), cache)
		}
		MultiExpAlgorithm::InterleavedWnaf => interleaved_wnaf(context, config.wnaf_window(), cache),
		MultiExpAlgorithm::Interleaved => Ok(interleaved(context)),
		MultiExpAlgorithm::Naive => Ok(naive(context, cache)),
	}
}

/// Odd powers `base^1, base^3, ...` for a window of `window` bits.
///
/// A table already stored in `cache` is reused. Otherwise the table is built for this call only,
/// so the cache holds just the bases that were warmed explicitly.
pub(crate) fn odd_power_table(
	base: &Element,
	window: usize,
	cache: Option<&PrecomputationCache>,
) -> Arc<[Element]> {
	let max_exponent = (1u64 << window) - 1;
	match cache.map(|cache| cache.get_odd_powers(base, max_exponent, false)) {
		Some(Ok(table)) => table,
		_ => extend_odd_powers(base, &[], 1 << (window - 1)).into(),
	}
}
