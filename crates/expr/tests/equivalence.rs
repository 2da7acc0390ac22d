// Copyright 2025 Irreducible Inc.

use algebrix_algebra::{groups::ExponentPairing, Element, Pairing, Structure};
use algebrix_expr::{
	rewrite::{
		EmptyElimination, ExpSwap, InvPushdown, MergeNestedConstExp, MergeNestedVarExp, OpInPow,
		PairingGtExp, PowExpMulLeft, PowExpMulRight,
	},
	BooleanExpr, Evaluator, EvaluatorConfig, ExponentExpr, ExprRef, GroupElementExpr,
	RewriteRule, RewriteStrategy, RuleSet, Substitutions,
};
use algebrix_multiexp::{Error as MultiExpError, MultiExpAlgorithm, MultiExpConfig};
use assert_matches::assert_matches;
use num_bigint::{BigInt, BigUint};
use proptest::{collection::vec, prelude::*};
use rand::{rngs::StdRng, SeedableRng};

type G = GroupElementExpr;

const ORDER: u32 = 1019;

fn pairing() -> Pairing {
	Pairing::new(ExponentPairing::toy())
}

fn target() -> Structure {
	pairing().gt()
}

fn source() -> Structure {
	pairing().g1()
}

fn target_element(k: u32) -> Element {
	target()
		.element(BigUint::from(4u32))
		.unwrap()
		.pow(&BigInt::from(k))
}

fn source_element(k: u32) -> Element {
	source().element(BigUint::from(k)).unwrap()
}

fn exponent() -> impl Strategy<Value = ExponentExpr> {
	let leaf = prop_oneof![
		(-50i64..50).prop_map(ExponentExpr::from),
		(0..3usize).prop_map(|i| ExponentExpr::variable(format!("x{i}"))),
	];
	leaf.prop_recursive(3, 8, 2, |inner| {
		prop_oneof![
			(inner.clone(), inner.clone()).prop_map(|(a, b)| a + b),
			(inner.clone(), inner.clone()).prop_map(|(a, b)| a * b),
			inner.prop_map(|a| -a),
			// invertible modulo the order of both structures
			(1i64..50).prop_map(|c| ExponentExpr::from(c).inv()),
		]
	})
}

fn source_expr() -> impl Strategy<Value = G> {
	prop_oneof![
		(0..ORDER).prop_map(|k| G::constant(source_element(k))),
		Just(G::typed_variable("s0", source())),
		((0..ORDER), exponent()).prop_map(|(k, e)| G::constant(source_element(k)).pow(e)),
		(0..ORDER).prop_map(|k| G::constant(source_element(k)) * G::typed_variable("s0", source())),
	]
}

fn target_expr() -> impl Strategy<Value = G> {
	let leaf = prop_oneof![
		4 => (0..ORDER).prop_map(|k| G::constant(target_element(k))),
		2 => (0..2usize).prop_map(|i| G::typed_variable(format!("h{i}"), target())),
		1 => Just(G::Empty(None)),
		1 => Just(G::neutral(target())),
		2 => (source_expr(), source_expr()).prop_map(|(a, b)| G::pairing(pairing(), a, b)),
	];
	leaf.prop_recursive(4, 24, 2, |inner| {
		prop_oneof![
			(inner.clone(), inner.clone()).prop_map(|(a, b)| a * b),
			inner.clone().prop_map(G::inv),
			(inner, exponent()).prop_map(|(a, e)| a.pow(e)),
		]
	})
}

fn bindings() -> impl Strategy<Value = Substitutions> {
	(vec(-2000i64..2000, 3), vec(0..ORDER, 2), 0..ORDER).prop_map(|(xs, hs, s)| {
		let mut bindings = Substitutions::new();
		for (i, x) in xs.into_iter().enumerate() {
			bindings.bind_exponent(format!("x{i}"), x);
		}
		for (i, h) in hs.into_iter().enumerate() {
			bindings.bind_element(format!("h{i}"), target_element(h));
		}
		bindings.bind_element("s0", source_element(s));
		bindings
	})
}

fn configs() -> Vec<EvaluatorConfig> {
	let mut configs = Vec::new();
	for rule_set in [RuleSet::Normalizing, RuleSet::Precomputing, RuleSet::Disabled] {
		for strategy in [RewriteStrategy::TopDown, RewriteStrategy::BottomUpExhaustive] {
			configs.push(
				EvaluatorConfig::default()
					.with_rule_set(rule_set)
					.with_strategy(strategy),
			);
		}
	}
	configs.push(EvaluatorConfig::default().with_concurrent(false));
	for algorithm in MultiExpAlgorithm::ALL {
		configs.push(EvaluatorConfig::default().with_multiexp(
			MultiExpConfig::default().with_forced_algorithm(Some(algorithm)),
		));
	}
	configs
}

fn group_rules() -> Vec<Box<dyn RewriteRule<G>>> {
	vec![
		Box::new(EmptyElimination),
		Box::new(InvPushdown),
		Box::new(ExpSwap),
		Box::new(PowExpMulLeft),
		Box::new(PowExpMulRight),
		Box::new(MergeNestedVarExp),
		Box::new(MergeNestedConstExp),
		Box::new(PairingGtExp),
		Box::new(OpInPow),
	]
}

fn subexpressions(expr: &G, out: &mut Vec<G>) {
	out.push(expr.clone());
	expr.visit_children(|child| {
		if let ExprRef::Group(child) = child {
			subexpressions(child, out);
		}
	});
}

fn exponent_bindings(values: &[i64]) -> Substitutions {
	values
		.iter()
		.enumerate()
		.fold(Substitutions::new(), |bindings, (i, &value)| {
			bindings.with_exponent(format!("x{i}"), value)
		})
}

/// Products of constant bases raised to linear exponents in `x0`, `x1` and `x2`.
fn linear_expr() -> impl Strategy<Value = G> {
	vec(((0..ORDER), vec(-20i64..20, 3), -20i64..20), 1..5).prop_map(|terms| {
		terms
			.into_iter()
			.map(|(k, coefficients, offset)| {
				let exponent = coefficients.into_iter().enumerate().fold(
					ExponentExpr::from(offset),
					|acc, (i, coefficient)| {
						acc + ExponentExpr::from(coefficient)
							* ExponentExpr::variable(format!("x{i}"))
					},
				);
				G::constant(target_element(k)).pow(exponent)
			})
			.reduce(G::op)
			.unwrap()
	})
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(48))]

	#[test]
	fn test_evaluator_matches_naive(expr in target_expr(), bindings in bindings()) {
		let Ok(expected) = expr.evaluate_with(&bindings) else {
			return Ok(());
		};
		for config in configs() {
			let evaluator = Evaluator::new(config);
			prop_assert_eq!(
				evaluator.evaluate_with(&expr, &bindings).unwrap(),
				expected.clone(),
				"{:?} on {}",
				config,
				expr
			);
		}
	}

	#[test]
	fn test_rules_are_sound(expr in target_expr(), bindings in bindings()) {
		let mut nodes = Vec::new();
		subexpressions(&expr, &mut nodes);
		let rules = group_rules();
		for node in nodes {
			let Ok(expected) = node.evaluate_with(&bindings) else {
				continue;
			};
			for rule in rules.iter().filter(|rule| rule.is_applicable(&node)) {
				let rewritten = rule.apply(&node);
				prop_assert_eq!(
					rewritten.evaluate_with(&bindings).ok(),
					Some(expected.clone()),
					"{} rewrote {} to {}",
					rule.name(),
					node,
					rewritten
				);
			}
		}
	}

	#[test]
	fn test_boolean_matches_naive(
		lhs in target_expr(),
		rhs in target_expr(),
		same in any::<bool>(),
		bindings in bindings(),
	) {
		let rhs = if same { lhs.clone().inv().inv() } else { rhs };
		let test = BooleanExpr::group_eq(lhs, rhs)
			.or(BooleanExpr::exponent_eq(ExponentExpr::variable("x0"), 17));
		let Ok(expected) = test.evaluate_with(&bindings) else {
			return Ok(());
		};
		for rule_set in [RuleSet::Normalizing, RuleSet::Precomputing, RuleSet::Disabled] {
			let evaluator = Evaluator::new(EvaluatorConfig::default().with_rule_set(rule_set));
			prop_assert_eq!(evaluator.evaluate_bool(&test, &bindings).unwrap(), expected);
		}
	}

	#[test]
	fn test_linearization_is_homomorphic(
		expr in linear_expr(),
		a in vec(-1000i64..1000, 3),
		b in vec(-1000i64..1000, 3),
	) {
		let (constant, linear) = expr.linearize().unwrap();
		prop_assert!(!constant.has_variables());

		let constant = constant.evaluate().unwrap();
		let at_a = linear.evaluate_with(&exponent_bindings(&a)).unwrap();
		let at_b = linear.evaluate_with(&exponent_bindings(&b)).unwrap();
		prop_assert_eq!(
			constant.op(&at_a),
			expr.evaluate_with(&exponent_bindings(&a)).unwrap()
		);

		let sum = a.iter().zip(&b).map(|(x, y)| x + y).collect::<Vec<_>>();
		prop_assert_eq!(
			at_a.op(&at_b),
			linear.evaluate_with(&exponent_bindings(&sum)).unwrap()
		);
		prop_assert!(linear.evaluate_with(&exponent_bindings(&[0, 0, 0])).unwrap().is_neutral());
	}
}

#[test]
fn test_exp_swap_feeds_the_power_cache() {
	let g = G::constant(target_element(1));
	let expr = g.clone().pow("x").pow(2);
	let evaluator = Evaluator::new(EvaluatorConfig::default().with_rule_set(RuleSet::Precomputing));

	assert_eq!(evaluator.optimize(&expr).unwrap(), g.clone().pow(2).pow("x"));
	assert_eq!(evaluator.precompute(&expr).unwrap(), 1);
	assert!(evaluator
		.cache()
		.get_power(&target_element(1), &BigInt::from(2))
		.is_some());

	let bindings = Substitutions::new().with_exponent("x", 7);
	assert_eq!(evaluator.evaluate_with(&expr, &bindings).unwrap(), target_element(14));
}

#[test]
fn test_missing_precomputation() {
	let evaluator = Evaluator::default();
	let mut rng = StdRng::seed_from_u64(11);
	let base = target().random_element(&mut rng);
	assert_matches!(
		evaluator.cache().get_odd_powers(&base, 6, false),
		Err(MultiExpError::MissingPrecomputation { .. })
	);

	// a warmed table serves later lookups without computing
	evaluator.cache().get_odd_powers(&base, 6, true).unwrap();
	let table = evaluator.cache().get_odd_powers(&base, 5, false).unwrap();
	assert_eq!(table[2], base.pow(&BigInt::from(5)));
}

#[test]
fn test_shared_cache_across_evaluators() {
	let evaluator = Evaluator::default();
	let product = (1..6)
		.map(|k| G::constant(target_element(k * 97)).pow(ExponentExpr::variable(format!("x{}", k % 3))))
		.reduce(G::op)
		.unwrap();
	evaluator.precompute(&product).unwrap();

	let shared = Evaluator::with_cache(
		EvaluatorConfig::default().with_rule_set(RuleSet::Disabled),
		evaluator.cache().clone(),
	);
	let bindings = exponent_bindings(&[3, -5, 1001]);
	assert_eq!(
		shared.evaluate_with(&product, &bindings).unwrap(),
		product.evaluate_with(&bindings).unwrap()
	);
}
