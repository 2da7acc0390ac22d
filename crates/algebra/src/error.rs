// Copyright 2025 Irreducible Inc.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("{structure} does not support {operation}")]
	UnsupportedOperation {
		structure: String,
		operation: &'static str,
	},
	#[error("invalid encoding of an element of {structure}: {reason}")]
	InvalidEncoding { structure: String, reason: String },
	#[error("{value} is not a valid element of {structure}")]
	InvalidElement { structure: String, value: String },
	#[error("{value} is not invertible modulo {modulus}")]
	NotInvertible { value: String, modulus: String },
	#[error("value type does not belong to {structure}")]
	StructureMismatch { structure: String },
	#[error("invalid structure parameters: {0}")]
	InvalidParameters(String),
	#[error("serialization error: {0}")]
	Serialization(#[from] algebrix_utils::SerializationError),
}
