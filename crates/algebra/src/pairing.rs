// Copyright 2025 Irreducible Inc.

use std::{
	fmt::{self, Debug, Display},
	hash::{Hash, Hasher},
	sync::Arc,
};

use auto_impl::auto_impl;

use crate::{Element, Structure};

/// A bilinear map `e: G1 x G2 -> GT`.
#[auto_impl(Box, Arc)]
pub trait BilinearMap: Debug + Send + Sync + 'static {
	/// A label identifying the map up to mathematical equality.
	fn label(&self) -> String;

	fn g1(&self) -> Structure;

	fn g2(&self) -> Structure;

	fn gt(&self) -> Structure;

	/// Applies the map. Arguments are guaranteed to belong to `g1` and `g2` respectively.
	fn apply(&self, lhs: &Element, rhs: &Element) -> Element;

	/// Whether `G1 == G2` and `e(a, b) == e(b, a)`.
	fn is_symmetric(&self) -> bool;
}

/// A cheaply clonable handle to a [`BilinearMap`], compared by label.
#[derive(Clone)]
pub struct Pairing {
	label: Arc<str>,
	map: Arc<dyn BilinearMap>,
}

impl Pairing {
	pub fn new<M: BilinearMap>(map: M) -> Self {
		Self {
			label: map.label().into(),
			map: Arc::new(map),
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn g1(&self) -> Structure {
		self.map.g1()
	}

	pub fn g2(&self) -> Structure {
		self.map.g2()
	}

	pub fn gt(&self) -> Structure {
		self.map.gt()
	}

	pub fn is_symmetric(&self) -> bool {
		self.map.is_symmetric()
	}

	/// Evaluates `e(lhs, rhs)`.
	///
	/// Panics if the arguments do not belong to the source groups of the map.
	pub fn apply(&self, lhs: &Element, rhs: &Element) -> Element {
		assert!(
			*lhs.structure() == self.g1() && *rhs.structure() == self.g2(),
			"pairing {} applied to elements of {} and {}",
			self.label,
			lhs.structure(),
			rhs.structure()
		);
		self.map.apply(lhs, rhs)
	}
}

impl PartialEq for Pairing {
	fn eq(&self, other: &Self) -> bool {
		self.label == other.label
	}
}

impl Eq for Pairing {}

impl Hash for Pairing {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.label.hash(state);
	}
}

impl Debug for Pairing {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Pairing({})", self.label)
	}
}

impl Display for Pairing {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.label)
	}
}
