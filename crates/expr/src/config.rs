// Copyright 2025 Irreducible Inc.

use algebrix_multiexp::MultiExpConfig;
use algebrix_utils::env::{boolean_env_flag_set, parsed_env_value};
use getset::CopyGetters;

use crate::{RewriteStrategy, RuleSet, DEFAULT_REWRITE_BUDGET};

/// Evaluates pairings, equality sides and lazy elements on the calling thread when set.
pub const SEQUENTIAL_ENV: &str = "ALGEBRIX_SEQUENTIAL";

/// Selects the rule set by name, see [`RuleSet`]'s `FromStr` implementation.
pub const RULE_SET_ENV: &str = "ALGEBRIX_RULE_SET";

/// Selects the rewrite strategy, `top-down` or `bottom-up`.
pub const REWRITE_STRATEGY_ENV: &str = "ALGEBRIX_REWRITE_STRATEGY";

/// Configuration of an [`Evaluator`](crate::Evaluator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct EvaluatorConfig {
	strategy: RewriteStrategy,
	rule_set: RuleSet,
	/// Maximum number of rule applications per rewritten expression.
	rewrite_budget: usize,
	/// Whether independent sub-computations run on the rayon pool.
	concurrent: bool,
	multiexp: MultiExpConfig,
}

impl Default for EvaluatorConfig {
	fn default() -> Self {
		Self {
			strategy: RewriteStrategy::default(),
			rule_set: RuleSet::default(),
			rewrite_budget: DEFAULT_REWRITE_BUDGET,
			concurrent: true,
			multiexp: MultiExpConfig::default(),
		}
	}
}

impl EvaluatorConfig {
	/// The default configuration adjusted by [`SEQUENTIAL_ENV`], [`RULE_SET_ENV`],
	/// [`REWRITE_STRATEGY_ENV`] and the variables read by [`MultiExpConfig::from_env`].
	pub fn from_env() -> Self {
		let mut config = Self {
			multiexp: MultiExpConfig::from_env(),
			..Self::default()
		};
		if boolean_env_flag_set(SEQUENTIAL_ENV) {
			config.concurrent = false;
		}
		if let Some(rule_set) = parsed_env_value(RULE_SET_ENV) {
			config.rule_set = rule_set;
		}
		if let Some(strategy) = parsed_env_value(REWRITE_STRATEGY_ENV) {
			config.strategy = strategy;
		}
		config
	}

	pub fn with_strategy(mut self, strategy: RewriteStrategy) -> Self {
		self.strategy = strategy;
		self
	}

	pub fn with_rule_set(mut self, rule_set: RuleSet) -> Self {
		self.rule_set = rule_set;
		self
	}

	pub fn with_rewrite_budget(mut self, budget: usize) -> Self {
		self.rewrite_budget = budget;
		self
	}

	pub fn with_concurrent(mut self, concurrent: bool) -> Self {
		self.concurrent = concurrent;
		self
	}

	pub fn with_multiexp(mut self, multiexp: MultiExpConfig) -> Self {
		self.multiexp = multiexp;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder() {
		let config = EvaluatorConfig::default()
			.with_rule_set(RuleSet::Precomputing)
			.with_strategy(RewriteStrategy::TopDown)
			.with_concurrent(false)
			.with_multiexp(MultiExpConfig::default().with_precompute(false));
		assert_eq!(config.rule_set(), RuleSet::Precomputing);
		assert_eq!(config.strategy(), RewriteStrategy::TopDown);
		assert!(!config.concurrent());
		assert!(!config.multiexp().precompute());
		assert_eq!(config.rewrite_budget(), DEFAULT_REWRITE_BUDGET);
	}
}
