// Copyright 2025 Irreducible Inc.

use algebrix_algebra::{
	groups::{Gl2Group, IntegerAddGroup, IntegerMulGroup},
	Structure,
};
use num_bigint::{BigInt, BigUint};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

fn structures() -> Vec<Structure> {
	vec![
		Structure::new(IntegerMulGroup::prime(BigUint::from(1_000_003u32))),
		Structure::new(IntegerMulGroup::new(BigUint::from(3_127u32 * 17))),
		Structure::new(IntegerAddGroup::new(BigUint::from(1019u32))),
		Structure::new(
			IntegerMulGroup::subgroup(
				BigUint::from(2039u32),
				BigUint::from(4u32),
				BigUint::from(1019u32),
			)
			.unwrap(),
		),
		Structure::new(Gl2Group::new(BigUint::from(13u32)).unwrap()),
	]
}

proptest! {
	#[test]
	fn test_group_axioms(seed in any::<u64>(), e1 in -500i64..500, e2 in -500i64..500) {
		let mut rng = StdRng::seed_from_u64(seed);
		for structure in structures() {
			let a = structure.random_element(&mut rng);
			let b = structure.random_element(&mut rng);
			let c = structure.random_element(&mut rng);
			let one = structure.neutral_element();

			prop_assert_eq!(a.op(&b).op(&c), a.op(&b.op(&c)));
			prop_assert_eq!(a.op(&one), a.clone());
			prop_assert!(a.op(&a.inv()).is_neutral());

			let (e1, e2) = (BigInt::from(e1), BigInt::from(e2));
			prop_assert_eq!(a.pow(&e1).op(&a.pow(&e2)), a.pow(&(&e1 + &e2)));
			prop_assert_eq!(a.pow(&e1).pow(&e2), a.pow(&(&e1 * &e2)));
			prop_assert_eq!(structure.decode_element(&a.encode()).unwrap(), a);
		}
	}
}
