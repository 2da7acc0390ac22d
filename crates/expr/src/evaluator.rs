// Copyright 2025 Irreducible Inc.

use std::sync::Arc;

use algebrix_algebra::{Element, Pairing, Structure};
use algebrix_multiexp::{multiexp, MultiExpContext, PrecomputationCache};
use algebrix_utils::{
	bail,
	rayon::{maybe_join, maybe_par_map},
};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use tracing::{debug, instrument};

use crate::{
	boolean::elements_equal, evaluate_exponent_in, BooleanExpr, Deferred, Error, EvaluatorConfig,
	ExponentExpr, GroupElementExpr, Rewriter, Substitutions,
};

/// Evaluates expressions by rewriting them, flattening every product over a commutative
/// structure into one multi-exponentiation, and dispatching it to the configured algorithm.
///
/// Clones share the precomputation cache.
#[derive(Debug, Clone)]
pub struct Evaluator {
	config: EvaluatorConfig,
	rewriter: Arc<Rewriter>,
	cache: Arc<PrecomputationCache>,
}

impl Default for Evaluator {
	fn default() -> Self {
		Self::new(EvaluatorConfig::default())
	}
}

/// The terms of a flattened product and the pairings whose values still have to be computed.
struct Flattened<'a> {
	terms: Vec<(Element, BigInt)>,
	pairings: Vec<(&'a Pairing, &'a GroupElementExpr, &'a GroupElementExpr, BigInt)>,
}

impl Evaluator {
	pub fn new(config: EvaluatorConfig) -> Self {
		Self::with_cache(config, Arc::new(PrecomputationCache::new()))
	}

	pub fn with_cache(config: EvaluatorConfig, cache: Arc<PrecomputationCache>) -> Self {
		let rewriter = Rewriter::new(config.rule_set(), config.strategy(), config.rewrite_budget());
		Self {
			config,
			rewriter: Arc::new(rewriter),
			cache,
		}
	}

	pub fn config(&self) -> &EvaluatorConfig {
		&self.config
	}

	pub fn cache(&self) -> &Arc<PrecomputationCache> {
		&self.cache
	}

	/// Rewrites `expr` with the configured rule set and strategy.
	pub fn optimize(&self, expr: &GroupElementExpr) -> Result<GroupElementExpr, Error> {
		self.rewriter.rewrite_group(expr)
	}

	pub fn optimize_boolean(&self, expr: &BooleanExpr) -> Result<BooleanExpr, Error> {
		self.rewriter.rewrite_boolean(expr)
	}

	pub fn evaluate(&self, expr: &GroupElementExpr) -> Result<Element, Error> {
		self.evaluate_with(expr, &Substitutions::default())
	}

	/// Evaluates `expr` under `bindings`.
	///
	/// The expression is rewritten before the bindings are substituted, so rules that depend on
	/// which sub-expressions are variable see the unbound shape.
	///
	/// ## Throws
	///
	/// * [`Error::UnboundVariable`] if a variable is not bound by `bindings`
	/// * [`Error::UnknownStructure`] if the whole expression is neutral of an unknown structure
	#[instrument(skip_all, level = "debug")]
	pub fn evaluate_with(
		&self,
		expr: &GroupElementExpr,
		bindings: &Substitutions,
	) -> Result<Element, Error> {
		let bound = self.optimize(expr)?.bind(bindings);
		self.evaluate_bound(&bound)?
			.ok_or_else(|| Error::UnknownStructure {
				node: expr.to_string(),
			})
	}

	/// Evaluates an exponent under `bindings`, modulo `modulus` when given and over the integers
	/// otherwise.
	pub fn evaluate_exponent(
		&self,
		expr: &ExponentExpr,
		bindings: &Substitutions,
		modulus: Option<&BigUint>,
	) -> Result<BigInt, Error> {
		let expr = expr.substitute(bindings);
		match modulus {
			Some(modulus) => Ok(expr.evaluate_mod(modulus)?.into()),
			None => expr.evaluate(),
		}
	}

	/// Evaluates a boolean expression, short-circuiting `And` and `Or` from the left.
	///
	/// Both sides of a group equality are evaluated concurrently when enabled.
	#[instrument(skip_all, level = "debug")]
	pub fn evaluate_bool(&self, expr: &BooleanExpr, bindings: &Substitutions) -> Result<bool, Error> {
		let bound = self.optimize_boolean(expr)?.bind(bindings);
		self.evaluate_bool_bound(&bound)
	}

	/// Starts [`Self::evaluate_bool`] on the rayon pool and returns its handle.
	///
	/// Evaluates on the calling thread when concurrency is disabled.
	pub fn evaluate_bool_lazy(
		&self,
		expr: BooleanExpr,
		bindings: Substitutions,
	) -> Deferred<Result<bool, Error>> {
		if !self.config.concurrent() {
			return Deferred::ready(self.evaluate_bool(&expr, &bindings));
		}
		let evaluator = self.clone();
		Deferred::spawn(move || evaluator.evaluate_bool(&expr, &bindings))
	}

	/// Splits the rewritten expression into its constant and linear parts, see
	/// [`GroupElementExpr::linearize`].
	pub fn linearize(
		&self,
		expr: &GroupElementExpr,
	) -> Result<(GroupElementExpr, GroupElementExpr), Error> {
		self.optimize(expr)?.linearize()
	}

	/// Warms the cache for the variable-free bases of every power in the rewritten `expr`.
	///
	/// A base `g^c` with constant `g` and `c` is stored as a power of `g`, which the evaluator
	/// picks up in place of `g`. Returns the number of odd-power tables computed or extended.
	#[instrument(skip_all, level = "debug")]
	pub fn precompute(&self, expr: &GroupElementExpr) -> Result<usize, Error> {
		let rewritten = self.optimize(expr)?;
		let mut bases = Vec::new();
		self.collect_constant_bases(&rewritten, &mut bases)?;

		let max_exponent = (1u64 << self.config.multiexp().wnaf_window()) - 1;
		for base in &bases {
			self.cache.get_odd_powers(base, max_exponent, true)?;
		}
		debug!(tables = bases.len(), max_exponent, "precomputed odd powers");
		Ok(bases.len())
	}

	fn collect_constant_bases(
		&self,
		expr: &GroupElementExpr,
		bases: &mut Vec<Element>,
	) -> Result<(), Error> {
		match expr {
			GroupElementExpr::Pow(base, _) if !base.has_variables() => {
				let value = match base.as_ref() {
					GroupElementExpr::Pow(inner, exponent) if !exponent.has_variables() => {
						match inner.as_ref() {
							GroupElementExpr::Constant(g) => Some(self.cached_atom(g, exponent)?),
							_ => self.evaluate_bound(base)?,
						}
					}
					_ => self.evaluate_bound(base)?,
				};
				if let Some(value) = value.filter(|value| !bases.contains(value)) {
					bases.push(value);
				}
				Ok(())
			}
			GroupElementExpr::Pow(base, _) => self.collect_constant_bases(base, bases),
			GroupElementExpr::Op(lhs, rhs) | GroupElementExpr::Pairing(_, lhs, rhs) => {
				self.collect_constant_bases(lhs, bases)?;
				self.collect_constant_bases(rhs, bases)
			}
			GroupElementExpr::Inv(child) => self.collect_constant_bases(child, bases),
			GroupElementExpr::Constant(_)
			| GroupElementExpr::Variable { .. }
			| GroupElementExpr::Empty(_) => Ok(()),
		}
	}

	/// `g^exponent`, stored in the cache as a power of `g`.
	fn cached_atom(&self, g: &Element, exponent: &ExponentExpr) -> Result<Element, Error> {
		let exponent = evaluate_exponent_in(exponent, g.structure())?;
		if let Some(power) = self.cache.get_power(g, &exponent) {
			return Ok(power);
		}
		let power = g.pow(&exponent);
		self.cache.add_power(g, &exponent, power.clone());
		Ok(power)
	}

	/// Evaluates a fully bound expression; `None` is the neutral element of an unknown structure.
	fn evaluate_bound(&self, expr: &GroupElementExpr) -> Result<Option<Element>, Error> {
		if let Some(name) = expr.variables().into_iter().next() {
			bail!(Error::UnboundVariable { name });
		}
		if let GroupElementExpr::Constant(element) = expr {
			return Ok(Some(element.clone()));
		}
		match expr.structure() {
			None => Ok(None),
			Some(structure) if structure.is_commutative() => {
				self.evaluate_commutative(expr, &structure).map(Some)
			}
			Some(structure) => self.evaluate_ordered(expr, &structure),
		}
	}

	/// Evaluates the whole product as one multi-exponentiation.
	fn evaluate_commutative(
		&self,
		expr: &GroupElementExpr,
		structure: &Structure,
	) -> Result<Element, Error> {
		let order = structure.size().map(BigInt::from);
		let mut flattened = Flattened {
			terms: Vec::new(),
			pairings: Vec::new(),
		};
		self.flatten(expr, BigInt::from(1), structure, order.as_ref(), &mut flattened)?;

		let pairings = maybe_par_map(
			flattened.pairings,
			self.config.concurrent(),
			|(pairing, lhs, rhs, multiplier)| {
				self.evaluate_pairing(pairing, lhs, rhs)
					.map(|value| (value, multiplier))
			},
		)
		.into_iter()
		.collect::<Result<Vec<_>, _>>()?;

		let context =
			MultiExpContext::from_terms(structure.clone(), flattened.terms.into_iter().chain(pairings));
		Ok(multiexp(&context, Some(&self.cache), &self.config.multiexp())?)
	}

	/// Collects `expr^multiplier` as terms of one product.
	fn flatten<'a>(
		&self,
		expr: &'a GroupElementExpr,
		multiplier: BigInt,
		structure: &Structure,
		order: Option<&BigInt>,
		out: &mut Flattened<'a>,
	) -> Result<(), Error> {
		match expr {
			GroupElementExpr::Constant(element) => out.terms.push((element.clone(), multiplier)),
			GroupElementExpr::Empty(_) => {}
			GroupElementExpr::Variable { name, .. } => {
				bail!(Error::UnboundVariable { name: name.clone() });
			}
			GroupElementExpr::Op(lhs, rhs) => {
				self.flatten(lhs, multiplier.clone(), structure, order, out)?;
				self.flatten(rhs, multiplier, structure, order, out)?;
			}
			GroupElementExpr::Inv(child) => self.flatten(child, -multiplier, structure, order, out)?,
			GroupElementExpr::Pow(base, exponent) => {
				let exponent = evaluate_exponent_in(exponent, structure)?;
				if let GroupElementExpr::Constant(g) = base.as_ref() {
					if let Some(power) = self.cached_power(g, &exponent) {
						out.terms.push((power, multiplier));
						return Ok(());
					}
				}
				let multiplier = match order {
					Some(order) => (multiplier * exponent).mod_floor(order),
					None => multiplier * exponent,
				};
				self.flatten(base, multiplier, structure, order, out)?;
			}
			GroupElementExpr::Pairing(pairing, lhs, rhs) => {
				out.pairings.push((pairing, lhs, rhs, multiplier))
			}
		}
		Ok(())
	}

	fn cached_power(&self, g: &Element, exponent: &BigInt) -> Option<Element> {
		if self.config.multiexp().precompute() {
			self.cache.get_power(g, exponent)
		} else {
			None
		}
	}

	fn evaluate_pairing(
		&self,
		pairing: &Pairing,
		lhs: &GroupElementExpr,
		rhs: &GroupElementExpr,
	) -> Result<Element, Error> {
		let (lhs, rhs) = maybe_join(
			self.config.concurrent(),
			|| self.evaluate_bound(lhs),
			|| self.evaluate_bound(rhs),
		);
		let lhs = lhs?.unwrap_or_else(|| pairing.g1().neutral_element());
		let rhs = rhs?.unwrap_or_else(|| pairing.g2().neutral_element());
		Ok(pairing.apply(&lhs, &rhs))
	}

	/// Evaluates over a non-commutative structure without reordering any factors.
	fn evaluate_ordered(
		&self,
		expr: &GroupElementExpr,
		structure: &Structure,
	) -> Result<Option<Element>, Error> {
		let value = match expr {
			GroupElementExpr::Constant(element) => Some(element.clone()),
			GroupElementExpr::Empty(_) => Some(structure.neutral_element()),
			GroupElementExpr::Variable { name, .. } => {
				bail!(Error::UnboundVariable { name: name.clone() });
			}
			GroupElementExpr::Op(lhs, rhs) => {
				let lhs = self.evaluate_ordered(lhs, structure)?;
				let rhs = self.evaluate_ordered(rhs, structure)?;
				match (lhs, rhs) {
					(Some(lhs), Some(rhs)) => Some(lhs.op(&rhs)),
					(value, None) | (None, value) => value,
				}
			}
			GroupElementExpr::Inv(child) => self
				.evaluate_ordered(child, structure)?
				.map(|value| value.inv()),
			GroupElementExpr::Pow(base, exponent) => {
				let exponent = evaluate_exponent_in(exponent, structure)?;
				match self.evaluate_ordered(base, structure)? {
					// powers of a single base commute, so any algorithm applies
					Some(base) => Some(multiexp(
						&MultiExpContext::from_terms(structure.clone(), [(base, exponent)]),
						Some(&self.cache),
						&self.config.multiexp(),
					)?),
					None => None,
				}
			}
			GroupElementExpr::Pairing(pairing, lhs, rhs) => {
				Some(self.evaluate_pairing(pairing, lhs, rhs)?)
			}
		};
		Ok(value)
	}

	fn evaluate_bool_bound(&self, expr: &BooleanExpr) -> Result<bool, Error> {
		match expr {
			BooleanExpr::Constant(value) => Ok(*value),
			BooleanExpr::Not(child) => Ok(!self.evaluate_bool_bound(child)?),
			BooleanExpr::And(lhs, rhs) => {
				Ok(self.evaluate_bool_bound(lhs)? && self.evaluate_bool_bound(rhs)?)
			}
			BooleanExpr::Or(lhs, rhs) => {
				Ok(self.evaluate_bool_bound(lhs)? || self.evaluate_bool_bound(rhs)?)
			}
			BooleanExpr::ExponentEq(lhs, rhs) => Ok(lhs.evaluate()? == rhs.evaluate()?),
			BooleanExpr::GroupEq(lhs, rhs) => {
				let (lhs, rhs) = maybe_join(
					self.config.concurrent(),
					|| self.evaluate_bound(lhs),
					|| self.evaluate_bound(rhs),
				);
				Ok(elements_equal(lhs?, rhs?))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use algebrix_algebra::groups::{ExponentPairing, Gl2Group, IntegerMulGroup};
	use algebrix_multiexp::MultiExpConfig;
	use assert_matches::assert_matches;

	use super::*;
	use crate::RuleSet;

	fn z101() -> Structure {
		Structure::new(IntegerMulGroup::prime(BigUint::from(101u32)))
	}

	fn c(value: u32) -> GroupElementExpr {
		z101().element(BigUint::from(value)).unwrap().into()
	}

	fn x() -> ExponentExpr {
		ExponentExpr::variable("x")
	}

	#[test]
	fn test_small_prime_scenario() {
		let expr = c(2).pow(3) * c(5).pow(5) * c(7).pow(7);
		for config in [
			EvaluatorConfig::default(),
			EvaluatorConfig::default().with_concurrent(false),
			EvaluatorConfig::default().with_rule_set(RuleSet::Disabled),
		] {
			assert_eq!(Evaluator::new(config).evaluate(&expr).unwrap(), c(23).evaluate().unwrap());
		}
	}

	#[test]
	fn test_unbound_and_unknown() {
		let evaluator = Evaluator::default();
		assert_matches!(
			evaluator.evaluate(&c(2).pow(x())),
			Err(Error::UnboundVariable { name }) if name == "x"
		);
		assert_matches!(
			evaluator.evaluate(&GroupElementExpr::Empty(None)),
			Err(Error::UnknownStructure { .. })
		);
	}

	#[test]
	fn test_non_commutative_order_is_kept() {
		let gl2 = Structure::new(Gl2Group::new(BigUint::from(7u32)).unwrap());
		let a = GroupElementExpr::constant(gl2.element(Gl2Group::matrix(1, 1, 0, 1)).unwrap());
		let b = GroupElementExpr::constant(gl2.element(Gl2Group::matrix(1, 0, 1, 1)).unwrap());
		let expr = (a.clone() * b.clone()).pow(x()) * a.clone().inv();
		let bindings = Substitutions::new().with_exponent("x", 5);
		let expected = expr.evaluate_with(&bindings).unwrap();
		assert_eq!(Evaluator::default().evaluate_with(&expr, &bindings).unwrap(), expected);
		let swapped = (b * a.clone()).pow(x()) * a.inv();
		assert_ne!(swapped.evaluate_with(&bindings).unwrap(), expected);
	}

	#[test]
	fn test_pairings_merge_into_target_product() {
		let pairing = Pairing::new(ExponentPairing::toy());
		let source = pairing.g1();
		let s = |value: u32| GroupElementExpr::constant(source.element(BigUint::from(value)).unwrap());
		let expr = GroupElementExpr::pairing(pairing.clone(), s(3), GroupElementExpr::variable("h"))
			.pow(x())
			* GroupElementExpr::pairing(pairing, s(5), s(7)).inv();
		let bindings = Substitutions::new()
			.with_exponent("x", 11)
			.with_element("h", source.element(BigUint::from(9u32)).unwrap());
		let expected = expr.evaluate_with(&bindings).unwrap();
		for concurrent in [true, false] {
			let evaluator = Evaluator::new(EvaluatorConfig::default().with_concurrent(concurrent));
			assert_eq!(evaluator.evaluate_with(&expr, &bindings).unwrap(), expected);
		}
	}

	#[test]
	fn test_precompute_warms_cache() {
		let evaluator = Evaluator::new(EvaluatorConfig::default().with_rule_set(RuleSet::Precomputing));
		let expr = c(2).pow(x()).pow(6) * c(3).pow(x() * ExponentExpr::from(4));
		assert_eq!(evaluator.precompute(&expr).unwrap(), 2);

		let max_exponent = (1u64 << evaluator.config().multiexp().wnaf_window()) - 1;
		let g6 = c(2).pow(6).evaluate().unwrap();
		assert!(evaluator.cache().get_odd_powers(&g6, max_exponent, false).is_ok());
		assert!(evaluator
			.cache()
			.get_power(&c(2).evaluate().unwrap(), &BigInt::from(6))
			.is_some());

		let bindings = Substitutions::new().with_exponent("x", 17);
		assert_eq!(
			evaluator.evaluate_with(&expr, &bindings).unwrap(),
			expr.evaluate_with(&bindings).unwrap()
		);
		let uncached = Evaluator::new(
			EvaluatorConfig::default()
				.with_multiexp(MultiExpConfig::default().with_precompute(false)),
		);
		assert_eq!(
			uncached.evaluate_with(&expr, &bindings).unwrap(),
			expr.evaluate_with(&bindings).unwrap()
		);
	}

	#[test]
	fn test_evaluate_bool() {
		let evaluator = Evaluator::default();
		let test = BooleanExpr::group_eq(c(2).pow(x()), c(4))
			.and(BooleanExpr::exponent_eq(x(), 2));
		for (value, expected) in [(2, true), (3, false), (102, false)] {
			let bindings = Substitutions::new().with_exponent("x", value);
			assert_eq!(evaluator.evaluate_bool(&test, &bindings).unwrap(), expected);
			let lazy = evaluator.evaluate_bool_lazy(test.clone(), bindings);
			assert_eq!(lazy.wait().unwrap(), expected);
		}
	}

	#[test]
	fn test_evaluate_exponent() {
		let evaluator = Evaluator::default();
		let expr = x() * ExponentExpr::from(3).inv();
		let bindings = Substitutions::new().with_exponent("x", 2);
		assert_eq!(
			evaluator
				.evaluate_exponent(&expr, &bindings, Some(&BigUint::from(7u32)))
				.unwrap(),
			BigInt::from(3)
		);
		assert_matches!(
			evaluator.evaluate_exponent(&expr, &bindings, None),
			Err(Error::NotInvertible { .. })
		);
	}
}
