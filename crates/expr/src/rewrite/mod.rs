// Copyright 2025 Irreducible Inc.

//! Term rewriting of group and boolean expressions into shapes that evaluate as few large
//! multi-exponentiations.

mod rules;

use std::{
	fmt::{self, Debug, Display},
	str::FromStr,
};

pub use rules::*;
use tracing::trace;

use crate::{BooleanExpr, Error, GroupElementExpr};

/// A local rewrite of a single node.
///
/// `apply` is only called on nodes for which `is_applicable` holds, and must return an
/// expression with the same value under every binding of the variables for which the original
/// node evaluates.
pub trait RewriteRule<E>: Debug + Send + Sync {
	fn name(&self) -> &'static str;

	fn is_applicable(&self, expr: &E) -> bool;

	fn apply(&self, expr: &E) -> E;
}

/// An ordered list of rules; the first applicable one wins.
#[derive(Debug)]
pub struct RuleApplicator<E> {
	rules: Vec<Box<dyn RewriteRule<E>>>,
}

impl<E> Default for RuleApplicator<E> {
	fn default() -> Self {
		Self { rules: Vec::new() }
	}
}

impl<E> RuleApplicator<E> {
	pub fn new(rules: Vec<Box<dyn RewriteRule<E>>>) -> Self {
		Self { rules }
	}

	pub fn rules(&self) -> impl Iterator<Item = &dyn RewriteRule<E>> {
		self.rules.iter().map(|rule| rule.as_ref())
	}

	/// The first rule applicable to `expr`.
	pub fn first_applicable(&self, expr: &E) -> Option<&dyn RewriteRule<E>> {
		self.rules().find(|rule| rule.is_applicable(expr))
	}

	/// Applies the first applicable rule, returning its name and the rewritten node.
	pub fn apply_first(&self, expr: &E) -> Option<(&'static str, E)> {
		self.first_applicable(expr)
			.map(|rule| (rule.name(), rule.apply(expr)))
	}
}

/// Order in which the rewriter visits nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RewriteStrategy {
	/// Rewrites a node until no rule fires, then descends into its children; passes repeat
	/// until one changes nothing.
	TopDown,
	/// Rewrites children first, then the node, renormalizing every rewritten node.
	#[default]
	BottomUpExhaustive,
}

impl Display for RewriteStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::TopDown => "top-down",
			Self::BottomUpExhaustive => "bottom-up",
		})
	}
}

impl FromStr for RewriteStrategy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"top-down" | "topdown" => Ok(Self::TopDown),
			"bottom-up" | "bottomup" => Ok(Self::BottomUpExhaustive),
			_ => Err(format!("unknown rewrite strategy {s}")),
		}
	}
}

/// The registered rule sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RuleSet {
	/// Merges nested powers and distributes powers over commutative products, so the evaluator
	/// sees one flat multi-exponentiation per structure.
	#[default]
	Normalizing,
	/// Moves constant exponents onto constant bases, exposing `g^c` sub-terms whose odd powers
	/// can be precomputed once and reused across bindings.
	Precomputing,
	/// No rewriting at all.
	Disabled,
}

impl RuleSet {
	pub fn group_rules(self) -> RuleApplicator<GroupElementExpr> {
		match self {
			Self::Normalizing => RuleApplicator::new(vec![
				Box::new(EmptyElimination),
				Box::new(InvPushdown),
				Box::new(MergeNestedConstExp),
				Box::new(MergeNestedVarExp),
				Box::new(PairingGtExp),
				Box::new(OpInPow),
			]),
			Self::Precomputing => RuleApplicator::new(vec![
				Box::new(EmptyElimination),
				Box::new(InvPushdown),
				Box::new(ExpSwap),
				Box::new(PowExpMulLeft),
				Box::new(PowExpMulRight),
				Box::new(MergeNestedConstExp),
				Box::new(PairingGtExp),
			]),
			Self::Disabled => RuleApplicator::default(),
		}
	}

	pub fn boolean_rules(self) -> RuleApplicator<BooleanExpr> {
		match self {
			Self::Normalizing | Self::Precomputing => {
				RuleApplicator::new(vec![Box::new(MoveEqTestToOneSide)])
			}
			Self::Disabled => RuleApplicator::default(),
		}
	}
}

impl Display for RuleSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Normalizing => "normalizing",
			Self::Precomputing => "precomputing",
			Self::Disabled => "disabled",
		})
	}
}

impl FromStr for RuleSet {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"normalizing" => Ok(Self::Normalizing),
			"precomputing" => Ok(Self::Precomputing),
			"disabled" | "none" => Ok(Self::Disabled),
			_ => Err(format!("unknown rule set {s}")),
		}
	}
}

/// Default bound on rule applications per rewrite.
pub const DEFAULT_REWRITE_BUDGET: usize = 10_000;

/// Drives rule applicators over whole expressions.
///
/// Every registered rule strictly decreases a well-founded measure of the tree, so rewriting
/// terminates; the budget turns a violation of that property into
/// [`Error::RewriteBudgetExhausted`] instead of a hang.
#[derive(Debug)]
pub struct Rewriter {
	strategy: RewriteStrategy,
	budget: usize,
	group_rules: RuleApplicator<GroupElementExpr>,
	boolean_rules: RuleApplicator<BooleanExpr>,
}

impl Rewriter {
	pub fn new(rule_set: RuleSet, strategy: RewriteStrategy, budget: usize) -> Self {
		Self::with_rules(rule_set.group_rules(), rule_set.boolean_rules(), strategy, budget)
	}

	pub fn with_rules(
		group_rules: RuleApplicator<GroupElementExpr>,
		boolean_rules: RuleApplicator<BooleanExpr>,
		strategy: RewriteStrategy,
		budget: usize,
	) -> Self {
		Self {
			strategy,
			budget,
			group_rules,
			boolean_rules,
		}
	}

	pub fn rewrite_group(&self, expr: &GroupElementExpr) -> Result<GroupElementExpr, Error> {
		Pass::new(&self.group_rules, self.budget).run(expr, self.strategy)
	}

	/// Rewrites the boolean structure first, then both sides of every group equality.
	pub fn rewrite_boolean(&self, expr: &BooleanExpr) -> Result<BooleanExpr, Error> {
		let rewritten = Pass::new(&self.boolean_rules, self.budget).run(expr, self.strategy)?;
		self.rewrite_equalities(&rewritten)
	}

	fn rewrite_equalities(&self, expr: &BooleanExpr) -> Result<BooleanExpr, Error> {
		match expr {
			BooleanExpr::GroupEq(lhs, rhs) => Ok(BooleanExpr::GroupEq(
				self.rewrite_group(lhs)?,
				self.rewrite_group(rhs)?,
			)),
			_ => expr.try_map_children(|child| self.rewrite_equalities(child)),
		}
	}
}

impl Default for Rewriter {
	fn default() -> Self {
		Self::new(RuleSet::default(), RewriteStrategy::default(), DEFAULT_REWRITE_BUDGET)
	}
}

/// Expressions whose same-family children can be rebuilt.
pub(crate) trait Rewritable: Clone + Display + Sized {
	fn try_map_children(
		&self,
		f: impl FnMut(&Self) -> Result<Self, Error>,
	) -> Result<Self, Error>;
}

impl Rewritable for GroupElementExpr {
	fn try_map_children(
		&self,
		mut f: impl FnMut(&Self) -> Result<Self, Error>,
	) -> Result<Self, Error> {
		Ok(match self {
			Self::Constant(_) | Self::Variable { .. } | Self::Empty(_) => self.clone(),
			Self::Op(lhs, rhs) => f(lhs)?.op(f(rhs)?),
			Self::Inv(child) => f(child)?.inv(),
			Self::Pow(base, exponent) => f(base)?.pow(exponent.clone()),
			Self::Pairing(pairing, lhs, rhs) => Self::pairing(pairing.clone(), f(lhs)?, f(rhs)?),
		})
	}
}

impl Rewritable for BooleanExpr {
	fn try_map_children(
		&self,
		mut f: impl FnMut(&Self) -> Result<Self, Error>,
	) -> Result<Self, Error> {
		Ok(match self {
			Self::Constant(_) | Self::ExponentEq(..) | Self::GroupEq(..) => self.clone(),
			Self::Not(child) => f(child)?.not(),
			Self::And(lhs, rhs) => f(lhs)?.and(f(rhs)?),
			Self::Or(lhs, rhs) => f(lhs)?.or(f(rhs)?),
		})
	}
}

/// One rewrite of one expression, sharing the budget across all nodes.
struct Pass<'a, E> {
	rules: &'a RuleApplicator<E>,
	budget: usize,
	applied: usize,
}

impl<'a, E: Rewritable> Pass<'a, E> {
	fn new(rules: &'a RuleApplicator<E>, budget: usize) -> Self {
		Self {
			rules,
			budget,
			applied: 0,
		}
	}

	fn run(mut self, expr: &E, strategy: RewriteStrategy) -> Result<E, Error> {
		if self.rules.rules.is_empty() {
			return Ok(expr.clone());
		}
		match strategy {
			RewriteStrategy::TopDown => {
				let mut expr = expr.clone();
				loop {
					let before = self.applied;
					expr = self.top_down(&expr)?;
					if self.applied == before {
						return Ok(expr);
					}
				}
			}
			RewriteStrategy::BottomUpExhaustive => self.bottom_up(expr),
		}
	}

	/// Applies the first applicable rule at `expr`, if any.
	fn fire(&mut self, expr: &E) -> Result<Option<E>, Error> {
		let Some(rule) = self.rules.first_applicable(expr) else {
			return Ok(None);
		};
		if self.applied == self.budget {
			return Err(Error::RewriteBudgetExhausted {
				rule: rule.name(),
				node: expr.to_string(),
				budget: self.budget,
			});
		}
		self.applied += 1;
		let rewritten = rule.apply(expr);
		trace!(rule = rule.name(), from = %expr, to = %rewritten, "rewrite");
		Ok(Some(rewritten))
	}

	fn top_down(&mut self, expr: &E) -> Result<E, Error> {
		let mut expr = expr.clone();
		while let Some(rewritten) = self.fire(&expr)? {
			expr = rewritten;
		}
		expr.try_map_children(|child| self.top_down(child))
	}

	fn bottom_up(&mut self, expr: &E) -> Result<E, Error> {
		let expr = expr.try_map_children(|child| self.bottom_up(child))?;
		match self.fire(&expr)? {
			Some(rewritten) => self.bottom_up(&rewritten),
			None => Ok(expr),
		}
	}
}
