// Copyright 2025 Irreducible Inc.

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	#[error("missing precomputation in {structure}: {what} for base {base}")]
	MissingPrecomputation {
		structure: String,
		base: String,
		what: String,
	},
	#[error("invalid multi-exponentiation configuration: {0}")]
	InvalidConfig(String),
	#[error("power-product table for {bases} bases with window {window} exceeds 2^{max_bits} entries")]
	TableTooLarge {
		bases: usize,
		window: usize,
		max_bits: usize,
	},
	#[error("invalid precomputed table in {structure}: {reason}")]
	InvalidTable { structure: String, reason: String },
	#[error("no structure labelled {label} is known to the snapshot resolver")]
	UnknownStructure { label: String },
	#[error("unknown multi-exponentiation algorithm {0:?}")]
	UnknownAlgorithm(String),
	#[error("serialization error: {0}")]
	Serialization(#[from] algebrix_utils::SerializationError),
	#[error("algebra error: {0}")]
	Algebra(#[from] algebrix_algebra::Error),
}
