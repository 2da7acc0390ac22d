// Copyright 2025 Irreducible Inc.

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	#[error("variable {name} is not bound")]
	UnboundVariable { name: String },
	#[error("expression {node} is not linear: {reason}")]
	NonLinear { node: String, reason: &'static str },
	#[error("{value} is not invertible in {modulus}")]
	NotInvertible { value: String, modulus: String },
	#[error("the structure of {node} is unknown")]
	UnknownStructure { node: String },
	#[error("negative exponent {exponent} of non-unit {base} over the integers")]
	NegativeExponent { base: String, exponent: String },
	#[error("exponent {exponent} is too large to evaluate over the integers")]
	ExponentTooLarge { exponent: String },
	#[error("rewrite budget of {budget} exhausted applying {rule} to {node}")]
	RewriteBudgetExhausted {
		rule: &'static str,
		node: String,
		budget: usize,
	},
	#[error("multi-exponentiation error: {0}")]
	MultiExp(#[from] algebrix_multiexp::Error),
	#[error("algebra error: {0}")]
	Algebra(#[from] algebrix_algebra::Error),
}
