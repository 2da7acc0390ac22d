// Copyright 2025 Irreducible Inc.

use algebrix_utils::{
	bail,
	env::{boolean_env_flag_set, parsed_env_value},
};
use getset::CopyGetters;

use crate::{Error, MultiExpAlgorithm};

/// The simultaneous algorithm's dense table has `2^(window * bases)` entries; this bounds the
/// exponent of that size.
pub const MAX_POWER_PRODUCT_TABLE_BITS: usize = 16;

/// Bound on the window size of odd-power tables, which hold `2^(window - 1)` entries per base.
pub const MAX_ODD_POWER_WINDOW: usize = 12;

/// Disables precomputation lookups when set.
pub const NO_PRECOMPUTE_ENV: &str = "ALGEBRIX_NO_PRECOMPUTE";

/// Forces an algorithm by name, see [`MultiExpAlgorithm`]'s `FromStr` implementation.
pub const FORCED_ALGORITHM_ENV: &str = "ALGEBRIX_MULTIEXP_ALGORITHM";

/// Tuning of the multi-exponentiation dispatcher.
///
/// Window sizes are validated when set, so an accepted configuration never fails mid-computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct MultiExpConfig {
	/// Algorithm used for every context, bypassing the selection policy.
	forced_algorithm: Option<MultiExpAlgorithm>,
	simultaneous_window: usize,
	sliding_window: usize,
	wnaf_window: usize,
	/// Whether windowed algorithms read and populate the precomputation cache.
	precompute: bool,
	/// Contexts with more distinct bases than this use the unwindowed algorithm.
	cache_base_threshold: usize,
}

impl Default for MultiExpConfig {
	fn default() -> Self {
		Self {
			forced_algorithm: None,
			simultaneous_window: 2,
			sliding_window: 4,
			wnaf_window: 4,
			precompute: true,
			cache_base_threshold: 32,
		}
	}
}

impl MultiExpConfig {
	/// The default configuration adjusted by [`NO_PRECOMPUTE_ENV`] and [`FORCED_ALGORITHM_ENV`].
	pub fn from_env() -> Self {
		let mut config = Self::default();
		if boolean_env_flag_set(NO_PRECOMPUTE_ENV) {
			config.precompute = false;
		}
		config.forced_algorithm = parsed_env_value(FORCED_ALGORITHM_ENV);
		config
	}

	pub fn with_forced_algorithm(mut self, algorithm: Option<MultiExpAlgorithm>) -> Self {
		self.forced_algorithm = algorithm;
		self
	}

	pub fn with_precompute(mut self, precompute: bool) -> Self {
		self.precompute = precompute;
		self
	}

	pub fn with_cache_base_threshold(mut self, threshold: usize) -> Self {
		self.cache_base_threshold = threshold;
		self
	}

	/// Sets the simultaneous algorithm's window; a single base must fit the table bound.
	pub fn with_simultaneous_window(mut self, window: usize) -> Result<Self, Error> {
		if window == 0 || window > MAX_POWER_PRODUCT_TABLE_BITS {
			bail!(Error::InvalidConfig(format!(
				"simultaneous window {window} must be within 1..={MAX_POWER_PRODUCT_TABLE_BITS}"
			)));
		}
		self.simultaneous_window = window;
		Ok(self)
	}

	pub fn with_sliding_window(mut self, window: usize) -> Result<Self, Error> {
		self.sliding_window = validate_odd_power_window("sliding", window)?;
		Ok(self)
	}

	pub fn with_wnaf_window(mut self, window: usize) -> Result<Self, Error> {
		self.wnaf_window = validate_odd_power_window("wNAF", window)?;
		Ok(self)
	}
}

/// The number of bases the simultaneous algorithm processes per table.
pub fn simultaneous_chunk_size(window: usize) -> usize {
	(MAX_POWER_PRODUCT_TABLE_BITS / window).max(1)
}

fn validate_odd_power_window(name: &str, window: usize) -> Result<usize, Error> {
	if window == 0 || window > MAX_ODD_POWER_WINDOW {
		bail!(Error::InvalidConfig(format!(
			"{name} window {window} must be within 1..={MAX_ODD_POWER_WINDOW}"
		)));
	}
	Ok(window)
}
