// Copyright 2025 Irreducible Inc.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex, OnceLock, PoisonError, RwLock},
};

use algebrix_algebra::{Element, Structure};
use num_bigint::BigInt;
use tracing::trace;

use crate::{
	compute_power_products, CacheSnapshot, Error, StructureSnapshot, MAX_POWER_PRODUCT_TABLE_BITS,
};

type OddPowersSlot = Arc<Mutex<Arc<[Element]>>>;
type PowerProductsKey = (Vec<Element>, usize);
type PowerProductsSlot = Arc<OnceLock<Arc<[Element]>>>;

/// Precomputed tables for the bases of one structure.
///
/// Every key has its own slot, so populating one base never blocks lookups of another.
#[derive(Debug, Default)]
struct StructureCache {
	odd_powers: RwLock<HashMap<Element, OddPowersSlot>>,
	power_products: RwLock<HashMap<PowerProductsKey, PowerProductsSlot>>,
	powers: RwLock<HashMap<(Element, BigInt), Element>>,
}

/// A concurrent cache of precomputed powers, keyed by structure.
///
/// Tables are handed out as immutable `Arc<[Element]>` snapshots. Extending an odd-power table
/// publishes a longer snapshot and leaves earlier ones untouched.
#[derive(Debug, Default)]
pub struct PrecomputationCache {
	structures: RwLock<HashMap<Structure, Arc<StructureCache>>>,
}

impl PrecomputationCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// The odd powers `base^1, base^3, ...` up to at least `base^max_exponent`.
	///
	/// The returned table may be longer than requested. When the table is missing or too short
	/// and `compute_if_missing` is false, this fails with [`Error::MissingPrecomputation`].
	pub fn get_odd_powers(
		&self,
		base: &Element,
		max_exponent: u64,
		compute_if_missing: bool,
	) -> Result<Arc<[Element]>, Error> {
		let needed = max_exponent.div_ceil(2) as usize;
		let missing = || Error::MissingPrecomputation {
			structure: base.structure().to_string(),
			base: base.to_string(),
			what: format!("odd powers up to {max_exponent}"),
		};

		let Some(cache) = self.structure_cache(base.structure(), compute_if_missing) else {
			return Err(missing());
		};
		let slot = read(&cache.odd_powers).get(base).cloned();
		let slot = match slot {
			Some(slot) => slot,
			None if compute_if_missing => write(&cache.odd_powers)
				.entry(base.clone())
				.or_insert_with(|| Arc::new(Mutex::new(Arc::from(Vec::new()))))
				.clone(),
			None => return Err(missing()),
		};

		let mut table = slot.lock().unwrap_or_else(PoisonError::into_inner);
		if table.len() >= needed {
			trace!(%base, entries = table.len(), "odd powers cache hit");
			return Ok(table.clone());
		}
		if !compute_if_missing {
			return Err(missing());
		}
		trace!(%base, from = table.len(), to = needed, "extending odd powers");
		let extended: Arc<[Element]> = extend_odd_powers(base, &table, needed).into();
		*table = extended.clone();
		Ok(extended)
	}

	/// Stores an odd-power table for `base`, keeping whichever of the stored and given tables is
	/// longer.
	///
	/// `powers[i]` must equal `base^(2i + 1)`. The first, second and last entries are checked and a
	/// mismatch fails with [`Error::InvalidTable`].
	pub fn add_odd_powers(&self, base: &Element, powers: Arc<[Element]>) -> Result<(), Error> {
		validate_odd_powers(base, &powers)?;
		self.install_odd_powers(base, powers);
		Ok(())
	}

	fn install_odd_powers(&self, base: &Element, powers: Arc<[Element]>) {
		let Some(cache) = self.structure_cache(base.structure(), true) else {
			return;
		};
		let slot = write(&cache.odd_powers)
			.entry(base.clone())
			.or_insert_with(|| Arc::new(Mutex::new(Arc::from(Vec::new()))))
			.clone();
		let mut table = slot.lock().unwrap_or_else(PoisonError::into_inner);
		if powers.len() > table.len() {
			*table = powers;
		}
	}

	/// The power-product table of `bases` for the given window, see
	/// [`compute_power_products`](crate::compute_power_products).
	///
	/// Concurrent requests for the same key compute the table once.
	pub fn get_power_products(
		&self,
		bases: &[Element],
		window: usize,
		compute_if_missing: bool,
	) -> Result<Arc<[Element]>, Error> {
		assert!(!bases.is_empty(), "power-product table needs at least one base");
		if window == 0 || window * bases.len() > MAX_POWER_PRODUCT_TABLE_BITS {
			return Err(Error::TableTooLarge {
				bases: bases.len(),
				window,
				max_bits: MAX_POWER_PRODUCT_TABLE_BITS,
			});
		}
		let structure = bases[0].structure();
		let missing = || Error::MissingPrecomputation {
			structure: structure.to_string(),
			base: bases.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
			what: format!("power products with window {window}"),
		};

		let Some(cache) = self.structure_cache(structure, compute_if_missing) else {
			return Err(missing());
		};
		let key = (bases.to_vec(), window);
		let slot = read(&cache.power_products).get(&key).cloned();
		let slot = match slot {
			Some(slot) => slot,
			None if compute_if_missing => write(&cache.power_products)
				.entry(key)
				.or_default()
				.clone(),
			None => return Err(missing()),
		};

		if let Some(table) = slot.get() {
			trace!(bases = bases.len(), window, "power products cache hit");
			return Ok(table.clone());
		}
		if !compute_if_missing {
			return Err(missing());
		}
		let table = slot.get_or_init(|| {
			compute_power_products(bases, window)
				.expect("table size is checked on entry")
				.into()
		});
		Ok(table.clone())
	}

	pub fn add_power(&self, base: &Element, exponent: &BigInt, power: Element) {
		if let Some(cache) = self.structure_cache(base.structure(), true) {
			write(&cache.powers).insert((base.clone(), exponent.clone()), power);
		}
	}

	pub fn get_power(&self, base: &Element, exponent: &BigInt) -> Option<Element> {
		let cache = self.structure_cache(base.structure(), false)?;
		let power = read(&cache.powers)
			.get(&(base.clone(), exponent.clone()))
			.cloned();
		power
	}

	/// Drops every cached table. Snapshots already handed out stay valid.
	pub fn reset(&self) {
		write(&self.structures).clear();
	}

	/// Copies the current content of the cache.
	pub fn snapshot(&self) -> CacheSnapshot {
		let structures = read(&self.structures)
			.iter()
			.map(|(structure, cache)| cache.snapshot(structure.clone()))
			.collect();
		CacheSnapshot::new(structures)
	}

	/// Adds every entry of `snapshot` that is missing here or longer than the present one.
	///
	/// The snapshot is validated first, see [`CacheSnapshot::validate`]. A rejected snapshot leaves
	/// the cache untouched.
	pub fn merge(&self, snapshot: &CacheSnapshot) -> Result<(), Error> {
		snapshot.validate()?;
		for entry in snapshot.structures() {
			for (base, powers) in &entry.odd_powers {
				self.install_odd_powers(base, powers.clone().into());
			}
			if let Some(cache) = self.structure_cache(&entry.structure, true) {
				let mut products = write(&cache.power_products);
				for (bases, window, table) in &entry.power_products {
					let slot = products.entry((bases.clone(), *window)).or_default();
					let _ = slot.set(table.clone().into());
				}
			}
			for (base, exponent, power) in &entry.powers {
				self.add_power(base, exponent, power.clone());
			}
		}
		Ok(())
	}

	fn structure_cache(&self, structure: &Structure, create: bool) -> Option<Arc<StructureCache>> {
		if let Some(cache) = read(&self.structures).get(structure) {
			return Some(cache.clone());
		}
		if !create {
			return None;
		}
		let cache = write(&self.structures)
			.entry(structure.clone())
			.or_default()
			.clone();
		Some(cache)
	}
}

impl StructureCache {
	fn snapshot(&self, structure: Structure) -> StructureSnapshot {
		let odd_powers = read(&self.odd_powers)
			.iter()
			.map(|(base, slot)| {
				let table = slot.lock().unwrap_or_else(PoisonError::into_inner);
				(base.clone(), table.to_vec())
			})
			.filter(|(_, table)| !table.is_empty())
			.collect();
		let power_products = read(&self.power_products)
			.iter()
			.filter_map(|((bases, window), slot)| {
				slot.get()
					.map(|table| (bases.clone(), *window, table.to_vec()))
			})
			.collect();
		let powers = read(&self.powers)
			.iter()
			.map(|((base, exponent), power)| (base.clone(), exponent.clone(), power.clone()))
			.collect();
		StructureSnapshot::new(structure, odd_powers, power_products, powers)
	}
}

/// Extends `existing`, the first odd powers of `base`, to `count` entries.
pub(crate) fn extend_odd_powers(base: &Element, existing: &[Element], count: usize) -> Vec<Element> {
	let mut powers = Vec::with_capacity(count.max(existing.len()));
	powers.extend_from_slice(existing);
	if powers.len() >= count {
		return powers;
	}
	if powers.is_empty() {
		powers.push(base.clone());
	}
	let square = base.square();
	while powers.len() < count {
		let next = powers[powers.len() - 1].op(&square);
		powers.push(next);
	}
	powers
}

pub(crate) fn invalid_table(structure: &Structure, reason: String) -> Error {
	Error::InvalidTable {
		structure: structure.to_string(),
		reason,
	}
}

/// Checks the shape of an odd-power table and spot-checks its first, second and last entries.
pub(crate) fn validate_odd_powers(base: &Element, powers: &[Element]) -> Result<(), Error> {
	let invalid = |reason| invalid_table(base.structure(), reason);
	if powers.is_empty() {
		return Err(invalid(format!("empty odd-power table for {base}")));
	}
	if let Some(foreign) = powers.iter().find(|p| p.structure() != base.structure()) {
		return Err(invalid(format!("odd power {foreign} of {base} lies in {}", foreign.structure())));
	}
	for i in [0, 1, powers.len() - 1] {
		if i >= powers.len() {
			continue;
		}
		let exponent = BigInt::from(2 * i + 1);
		if powers[i] != base.pow(&exponent) {
			return Err(invalid(format!("entry {i} of the odd powers of {base} is not {base}^{exponent}")));
		}
	}
	Ok(())
}

/// Checks the shape of a power-product table and spot-checks the neutral entry, the entry of every
/// base and the last entry.
pub(crate) fn validate_power_products(
	bases: &[Element],
	window: usize,
	table: &[Element],
) -> Result<(), Error> {
	let Some(first) = bases.first() else {
		return Err(Error::InvalidTable {
			structure: table
				.first()
				.map(|element| element.structure().to_string())
				.unwrap_or_default(),
			reason: "power-product table without bases".to_string(),
		});
	};
	let structure = first.structure();
	let invalid = |reason| invalid_table(structure, reason);
	let bits = window
		.checked_mul(bases.len())
		.filter(|&bits| window > 0 && bits <= MAX_POWER_PRODUCT_TABLE_BITS)
		.ok_or(Error::TableTooLarge {
			bases: bases.len(),
			window,
			max_bits: MAX_POWER_PRODUCT_TABLE_BITS,
		})?;
	if table.len() != 1 << bits {
		return Err(invalid(format!(
			"power-product table for {} bases with window {window} has {} entries instead of {}",
			bases.len(),
			table.len(),
			1usize << bits
		)));
	}
	if let Some(foreign) = bases.iter().chain(table).find(|e| e.structure() != structure) {
		return Err(invalid(format!("power-product entry {foreign} lies in {}", foreign.structure())));
	}
	if !table[0].is_neutral() {
		return Err(invalid("power-product table does not start with the neutral element".to_string()));
	}
	for (j, base) in bases.iter().enumerate() {
		if table[1 << (j * window)] != *base {
			return Err(invalid(format!("power-product entry of base {j} is not {base}")));
		}
	}
	let top = BigInt::from((1u64 << window) - 1);
	let last = bases
		.iter()
		.fold(structure.neutral_element(), |acc, base| acc.op(&base.pow(&top)));
	if table[table.len() - 1] != last {
		return Err(invalid("last power-product entry does not match its bases".to_string()));
	}
	Ok(())
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
	lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
	lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
	use std::thread;

	use algebrix_algebra::groups::IntegerMulGroup;
	use assert_matches::assert_matches;
	use num_bigint::BigUint;

	use super::*;

	fn z101() -> Structure {
		Structure::new(IntegerMulGroup::prime(BigUint::from(101u32)))
	}

	fn element(value: u32) -> Element {
		z101().element(BigUint::from(value)).unwrap()
	}

	#[test]
	fn test_missing_odd_powers_reported() {
		let cache = PrecomputationCache::new();
		assert_matches!(
			cache.get_odd_powers(&element(3), 6, false),
			Err(Error::MissingPrecomputation { .. })
		);
	}

	#[test]
	fn test_odd_powers_are_extended_and_shared() {
		let cache = PrecomputationCache::new();
		let base = element(3);
		let short = cache.get_odd_powers(&base, 3, true).unwrap();
		assert_eq!(short.len(), 2);

		let long = cache.get_odd_powers(&base, 15, true).unwrap();
		assert_eq!(long.len(), 8);
		for (i, power) in long.iter().enumerate() {
			assert_eq!(*power, base.pow(&BigInt::from(2 * i + 1)));
		}
		// The earlier snapshot is untouched.
		assert_eq!(short.len(), 2);

		let again = cache.get_odd_powers(&base, 7, false).unwrap();
		assert!(Arc::ptr_eq(&again, &long));
	}

	#[test]
	fn test_structures_with_equal_labels_share_entries() {
		let cache = PrecomputationCache::new();
		cache.get_odd_powers(&element(5), 7, true).unwrap();
		let other = Structure::new(IntegerMulGroup::prime(BigUint::from(101u32)))
			.element(BigUint::from(5u32))
			.unwrap();
		assert!(cache.get_odd_powers(&other, 7, false).is_ok());
	}

	#[test]
	fn test_power_products_table() {
		let cache = PrecomputationCache::new();
		let bases = vec![element(2), element(3)];
		assert_matches!(
			cache.get_power_products(&bases, 2, false),
			Err(Error::MissingPrecomputation { .. })
		);
		let table = cache.get_power_products(&bases, 2, true).unwrap();
		assert_eq!(table.len(), 16);
		// index 0b11_01 is 2^1 * 3^3
		let expected = bases[0].op(&bases[1].pow(&BigInt::from(3)));
		assert_eq!(table[0b1101], expected);

		assert_matches!(
			cache.get_power_products(&bases, 9, true),
			Err(Error::TableTooLarge { bases: 2, window: 9, .. })
		);
	}

	#[test]
	fn test_inconsistent_odd_powers_rejected() {
		let cache = PrecomputationCache::new();
		let base = element(2);
		let bogus: Arc<[Element]> = vec![element(3); 8].into();
		assert_matches!(cache.add_odd_powers(&base, bogus), Err(Error::InvalidTable { .. }));

		let mut powers = extend_odd_powers(&base, &[], 8);
		powers[7] = element(3);
		assert_matches!(cache.add_odd_powers(&base, powers.into()), Err(Error::InvalidTable { .. }));
		assert_matches!(
			cache.add_odd_powers(&base, Vec::new().into()),
			Err(Error::InvalidTable { .. })
		);
		assert!(cache.get_odd_powers(&base, 1, false).is_err());

		cache
			.add_odd_powers(&base, extend_odd_powers(&base, &[], 8).into())
			.unwrap();
		let table = cache.get_odd_powers(&base, 15, false).unwrap();
		assert_eq!(table[7], base.pow(&BigInt::from(15)));
	}

	#[test]
	fn test_power_products_validation() {
		let bases = vec![element(2), element(3)];
		let table = compute_power_products(&bases, 2).unwrap();
		validate_power_products(&bases, 2, &table).unwrap();

		assert_matches!(
			validate_power_products(&bases, 2, &table[..2]),
			Err(Error::InvalidTable { .. })
		);
		let mut swapped = table.clone();
		swapped.swap(1, 4);
		assert_matches!(
			validate_power_products(&bases, 2, &swapped),
			Err(Error::InvalidTable { .. })
		);
		assert_matches!(
			validate_power_products(&bases, 0, &table[..1]),
			Err(Error::TableTooLarge { window: 0, .. })
		);
		assert_matches!(
			validate_power_products(&bases, usize::MAX, &table),
			Err(Error::TableTooLarge { .. })
		);
	}

	#[test]
	fn test_powers_and_reset() {
		let cache = PrecomputationCache::new();
		let base = element(7);
		let exponent = BigInt::from(42);
		assert_eq!(cache.get_power(&base, &exponent), None);
		cache.add_power(&base, &exponent, base.pow(&exponent));
		assert_eq!(cache.get_power(&base, &exponent), Some(base.pow(&exponent)));

		cache.reset();
		assert_eq!(cache.get_power(&base, &exponent), None);
	}

	#[test]
	fn test_concurrent_population() {
		let cache = PrecomputationCache::new();
		let bases = (2..10).map(element).collect::<Vec<_>>();
		thread::scope(|scope| {
			for thread_index in 0..4 {
				let cache = &cache;
				let bases = &bases;
				scope.spawn(move || {
					for (i, base) in bases.iter().enumerate() {
						let max_exponent = 1 + 2 * ((i + thread_index) % 5) as u64;
						cache.get_odd_powers(base, max_exponent, true).unwrap();
					}
				});
			}
		});
		for base in &bases {
			let table = cache.get_odd_powers(base, 1, false).unwrap();
			for (i, power) in table.iter().enumerate() {
				assert_eq!(*power, base.pow(&BigInt::from(2 * i + 1)));
			}
		}
	}
}
