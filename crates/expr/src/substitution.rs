// Copyright 2025 Irreducible Inc.

use std::collections::HashMap;

use crate::{ExponentExpr, GroupElementExpr};

/// Bindings of variable names to exponent and group element expressions.
///
/// Exponent and group variables live in separate namespaces.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
	exponents: HashMap<String, ExponentExpr>,
	elements: HashMap<String, GroupElementExpr>,
}

impl Substitutions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_exponent(
		mut self,
		name: impl Into<String>,
		value: impl Into<ExponentExpr>,
	) -> Self {
		self.bind_exponent(name, value);
		self
	}

	pub fn with_element(
		mut self,
		name: impl Into<String>,
		value: impl Into<GroupElementExpr>,
	) -> Self {
		self.bind_element(name, value);
		self
	}

	pub fn bind_exponent(&mut self, name: impl Into<String>, value: impl Into<ExponentExpr>) {
		self.exponents.insert(name.into(), value.into());
	}

	pub fn bind_element(&mut self, name: impl Into<String>, value: impl Into<GroupElementExpr>) {
		self.elements.insert(name.into(), value.into());
	}

	pub fn exponent(&self, name: &str) -> Option<&ExponentExpr> {
		self.exponents.get(name)
	}

	pub fn element(&self, name: &str) -> Option<&GroupElementExpr> {
		self.elements.get(name)
	}

	pub fn is_empty(&self) -> bool {
		self.exponents.is_empty() && self.elements.is_empty()
	}
}
