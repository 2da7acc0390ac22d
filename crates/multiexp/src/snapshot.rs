// Copyright 2025 Irreducible Inc.

use std::collections::HashMap;

use algebrix_algebra::{Element, Structure};
use algebrix_utils::{
	serialization::{read_bytes, write_bytes},
	DeserializeBytes, SerializationError, SerializeBytes,
};
use bytes::{Buf, BufMut};
use num_bigint::BigInt;

use crate::{
	cache::{invalid_table, validate_odd_powers, validate_power_products},
	Error,
};

/// The cached tables of one structure, as captured by
/// [`PrecomputationCache::snapshot`](crate::PrecomputationCache::snapshot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureSnapshot {
	pub structure: Structure,
	/// `(base, [base^1, base^3, ...])`
	pub odd_powers: Vec<(Element, Vec<Element>)>,
	/// `(bases, window, table)`
	pub power_products: Vec<(Vec<Element>, usize, Vec<Element>)>,
	/// `(base, exponent, base^exponent)`
	pub powers: Vec<(Element, BigInt, Element)>,
}

impl StructureSnapshot {
	/// Creates a snapshot with entries sorted by their encoding, so equal caches produce equal
	/// snapshots.
	pub fn new(
		structure: Structure,
		mut odd_powers: Vec<(Element, Vec<Element>)>,
		mut power_products: Vec<(Vec<Element>, usize, Vec<Element>)>,
		mut powers: Vec<(Element, BigInt, Element)>,
	) -> Self {
		odd_powers.sort_by_cached_key(|(base, _)| base.encode());
		power_products.sort_by_cached_key(|(bases, window, _)| {
			(bases.iter().map(Element::encode).collect::<Vec<_>>(), *window)
		});
		powers.sort_by_cached_key(|(base, exponent, _)| (base.encode(), exponent.clone()));
		Self {
			structure,
			odd_powers,
			power_products,
			powers,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.odd_powers.is_empty() && self.power_products.is_empty() && self.powers.is_empty()
	}

	/// Checks that every table lies in the structure and is shaped like the tables the cache
	/// builds.
	///
	/// Odd-power and power-product tables are spot-checked against their bases, single powers are
	/// recomputed.
	pub fn validate(&self) -> Result<(), Error> {
		for (base, powers) in &self.odd_powers {
			self.check_structure(base)?;
			validate_odd_powers(base, powers)?;
		}
		for (bases, window, table) in &self.power_products {
			if let Some(base) = bases.first() {
				self.check_structure(base)?;
			}
			validate_power_products(bases, *window, table)?;
		}
		for (base, exponent, power) in &self.powers {
			self.check_structure(base)?;
			self.check_structure(power)?;
			if base.pow(exponent) != *power {
				return Err(invalid_table(
					&self.structure,
					format!("stored power {power} is not {base}^{exponent}"),
				));
			}
		}
		Ok(())
	}

	fn check_structure(&self, element: &Element) -> Result<(), Error> {
		if element.structure() != &self.structure {
			return Err(invalid_table(
				&self.structure,
				format!("{element} lies in {}", element.structure()),
			));
		}
		Ok(())
	}
}

/// A persistable copy of a [`PrecomputationCache`](crate::PrecomputationCache).
///
/// Elements are stored in their structure's encoding next to the structure label. Reading a
/// snapshot back requires a resolver from labels to structures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
	structures: Vec<StructureSnapshot>,
}

impl CacheSnapshot {
	pub fn new(mut structures: Vec<StructureSnapshot>) -> Self {
		structures.retain(|entry| !entry.is_empty());
		structures.sort_by(|a, b| a.structure.label().cmp(b.structure.label()));
		Self { structures }
	}

	pub fn structures(&self) -> &[StructureSnapshot] {
		&self.structures
	}

	pub fn is_empty(&self) -> bool {
		self.structures.is_empty()
	}

	pub fn validate(&self) -> Result<(), Error> {
		self.structures.iter().try_for_each(StructureSnapshot::validate)
	}

	/// Reads a snapshot written by [`SerializeBytes::serialize`].
	///
	/// Fails with [`Error::UnknownStructure`] when `resolve` does not know a label and with
	/// [`Error::InvalidTable`] when a table does not pass [`CacheSnapshot::validate`].
	pub fn deserialize(
		mut read_buf: impl Buf,
		resolve: impl Fn(&str) -> Option<Structure>,
	) -> Result<Self, Error> {
		let len = usize::deserialize(&mut read_buf)?;
		let structures = (0..len)
			.map(|_| read_structure(&mut read_buf, &resolve))
			.collect::<Result<_, _>>()?;
		let snapshot = Self::new(structures);
		snapshot.validate()?;
		Ok(snapshot)
	}
}

/// A resolver accepting exactly the given structures.
pub fn label_resolver(
	structures: impl IntoIterator<Item = Structure>,
) -> impl Fn(&str) -> Option<Structure> {
	let structures = structures
		.into_iter()
		.map(|structure| (structure.label().to_string(), structure))
		.collect::<HashMap<_, _>>();
	move |label| structures.get(label).cloned()
}

impl SerializeBytes for CacheSnapshot {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.structures.len().serialize(&mut write_buf)?;
		for entry in &self.structures {
			entry
				.structure
				.label()
				.to_string()
				.serialize(&mut write_buf)?;

			entry.odd_powers.len().serialize(&mut write_buf)?;
			for (base, powers) in &entry.odd_powers {
				write_element(base, &mut write_buf)?;
				write_elements(powers, &mut write_buf)?;
			}

			entry.power_products.len().serialize(&mut write_buf)?;
			for (bases, window, table) in &entry.power_products {
				write_elements(bases, &mut write_buf)?;
				window.serialize(&mut write_buf)?;
				write_elements(table, &mut write_buf)?;
			}

			entry.powers.len().serialize(&mut write_buf)?;
			for (base, exponent, power) in &entry.powers {
				write_element(base, &mut write_buf)?;
				write_bytes(&exponent.to_signed_bytes_le(), &mut write_buf)?;
				write_element(power, &mut write_buf)?;
			}
		}
		Ok(())
	}
}

fn write_element(element: &Element, write_buf: impl BufMut) -> Result<(), SerializationError> {
	write_bytes(&element.encode(), write_buf)
}

fn write_elements(elements: &[Element], mut write_buf: impl BufMut) -> Result<(), SerializationError> {
	elements.len().serialize(&mut write_buf)?;
	elements
		.iter()
		.try_for_each(|element| write_element(element, &mut write_buf))
}

fn read_structure(
	mut read_buf: impl Buf,
	resolve: &impl Fn(&str) -> Option<Structure>,
) -> Result<StructureSnapshot, Error> {
	let label = String::deserialize(&mut read_buf)?;
	let structure = resolve(&label).ok_or(Error::UnknownStructure { label })?;

	let odd_powers = (0..usize::deserialize(&mut read_buf)?)
		.map(|_| {
			let base = read_element(&structure, &mut read_buf)?;
			let powers = read_elements(&structure, &mut read_buf)?;
			Ok((base, powers))
		})
		.collect::<Result<_, Error>>()?;

	let power_products = (0..usize::deserialize(&mut read_buf)?)
		.map(|_| {
			let bases = read_elements(&structure, &mut read_buf)?;
			let window = usize::deserialize(&mut read_buf)?;
			let table = read_elements(&structure, &mut read_buf)?;
			Ok((bases, window, table))
		})
		.collect::<Result<_, Error>>()?;

	let powers = (0..usize::deserialize(&mut read_buf)?)
		.map(|_| {
			let base = read_element(&structure, &mut read_buf)?;
			let exponent = BigInt::from_signed_bytes_le(&read_bytes(&mut read_buf)?);
			let power = read_element(&structure, &mut read_buf)?;
			Ok((base, exponent, power))
		})
		.collect::<Result<_, Error>>()?;

	Ok(StructureSnapshot::new(structure, odd_powers, power_products, powers))
}

fn read_element(structure: &Structure, read_buf: impl Buf) -> Result<Element, Error> {
	let bytes = read_bytes(read_buf)?;
	Ok(structure.decode_element(&bytes)?)
}

fn read_elements(structure: &Structure, mut read_buf: impl Buf) -> Result<Vec<Element>, Error> {
	let len = usize::deserialize(&mut read_buf)?;
	(0..len)
		.map(|_| read_element(structure, &mut read_buf))
		.collect()
}

#[cfg(test)]
mod tests {
	use algebrix_algebra::groups::{Gl2Group, IntegerMulGroup};
	use assert_matches::assert_matches;
	use num_bigint::BigUint;
	use rand::{rngs::StdRng, SeedableRng};

	use super::*;
	use crate::PrecomputationCache;

	fn structures() -> Vec<Structure> {
		vec![
			Structure::new(IntegerMulGroup::prime(BigUint::from(1_000_003u32))),
			Structure::new(Gl2Group::new(BigUint::from(13u32)).unwrap()),
		]
	}

	fn populated_cache() -> PrecomputationCache {
		let mut rng = StdRng::seed_from_u64(0);
		let cache = PrecomputationCache::new();
		for structure in structures() {
			let g = structure.random_element(&mut rng);
			let h = structure.random_element(&mut rng);
			cache.get_odd_powers(&g, 15, true).unwrap();
			cache
				.get_power_products(&[g.clone(), h.clone()], 2, true)
				.unwrap();
			let exponent = BigInt::from(-12345);
			cache.add_power(&h, &exponent, h.pow(&exponent));
		}
		cache
	}

	#[test]
	fn test_snapshot_persists_and_merges() {
		let snapshot = populated_cache().snapshot();
		assert_eq!(snapshot.structures().len(), 2);

		let mut bytes = Vec::new();
		snapshot.serialize(&mut bytes).unwrap();
		let restored =
			CacheSnapshot::deserialize(bytes.as_slice(), label_resolver(structures())).unwrap();
		assert_eq!(restored, snapshot);

		let cache = PrecomputationCache::new();
		cache.merge(&restored).unwrap();
		assert_eq!(cache.snapshot(), snapshot);

		let entry = &restored.structures()[0];
		let (base, powers) = &entry.odd_powers[0];
		let cached = cache.get_odd_powers(base, 15, false).unwrap();
		assert_eq!(cached.as_ref(), powers.as_slice());
	}

	#[test]
	fn test_unknown_label_rejected() {
		let mut bytes = Vec::new();
		populated_cache().snapshot().serialize(&mut bytes).unwrap();
		assert_matches!(
			CacheSnapshot::deserialize(bytes.as_slice(), |_: &str| None),
			Err(Error::UnknownStructure { .. })
		);
	}

	#[test]
	fn test_inconsistent_tables_rejected() {
		let structure = structures()[0].clone();
		let element = |value: u32| structure.element(BigUint::from(value)).unwrap();
		let (g, h) = (element(2), element(3));
		let products = crate::compute_power_products(&[g.clone(), h.clone()], 2).unwrap();

		let rejected = [
			// odd powers that are not powers of the base
			StructureSnapshot::new(
				structure.clone(),
				vec![(g.clone(), vec![h.clone(); 8])],
				vec![],
				vec![],
			),
			// a table too short for its bases and window
			StructureSnapshot::new(
				structure.clone(),
				vec![],
				vec![(vec![g.clone(), h.clone()], 2, products[..2].to_vec())],
				vec![],
			),
			// a window beyond the table bound
			StructureSnapshot::new(
				structure.clone(),
				vec![],
				vec![(vec![g.clone(), h.clone()], 9, products.clone())],
				vec![],
			),
			// g^6 stored as g^5
			StructureSnapshot::new(
				structure.clone(),
				vec![],
				vec![],
				vec![(g.clone(), BigInt::from(5), g.pow(&BigInt::from(6)))],
			),
		];
		for entry in rejected {
			let snapshot = CacheSnapshot::new(vec![entry]);
			let cache = PrecomputationCache::new();
			assert_matches!(
				cache.merge(&snapshot),
				Err(Error::InvalidTable { .. } | Error::TableTooLarge { .. })
			);
			assert!(cache.snapshot().is_empty());

			let mut bytes = Vec::new();
			snapshot.serialize(&mut bytes).unwrap();
			assert_matches!(
				CacheSnapshot::deserialize(bytes.as_slice(), label_resolver(structures())),
				Err(Error::InvalidTable { .. } | Error::TableTooLarge { .. })
			);
		}
	}

	#[test]
	fn test_foreign_elements_rejected() {
		let structures = structures();
		let (ints, matrices) = (structures[0].clone(), structures[1].clone());
		let mut rng = StdRng::seed_from_u64(3);
		let g = matrices.random_element(&mut rng);
		let entry = StructureSnapshot::new(ints, vec![(g.clone(), vec![g])], vec![], vec![]);
		assert_matches!(
			PrecomputationCache::new().merge(&CacheSnapshot::new(vec![entry])),
			Err(Error::InvalidTable { .. })
		);
	}

	#[test]
	fn test_truncated_snapshot_rejected() {
		let mut bytes = Vec::new();
		populated_cache().snapshot().serialize(&mut bytes).unwrap();
		bytes.truncate(bytes.len() / 2);
		assert_matches!(
			CacheSnapshot::deserialize(bytes.as_slice(), label_resolver(structures())),
			Err(Error::Serialization(_) | Error::Algebra(_))
		);
	}
}
