// Copyright 2024-2025 Irreducible Inc.

use std::{env, sync::OnceLock};

use rayon::prelude::*;

/// In case when number of threads is set to 1, use rayon thread pool with
/// `use_current_thread` set to true, so that background evaluations and pairing jobs run on the
/// caller's thread and profiles stay readable.
///
/// NOTE: rayon doesn't allow initializing global thread pool several times, so
/// in case when it was initialized before this function returns an error.
/// The function returns reference to the result because `ThreadPoolBuildError`
/// doesn't implement `Clone`.
pub fn adjust_thread_pool() -> &'static Result<(), rayon::ThreadPoolBuildError> {
	static ONCE_GUARD: OnceLock<Result<(), rayon::ThreadPoolBuildError>> = OnceLock::new();

	ONCE_GUARD.get_or_init(|| match env::var("RAYON_NUM_THREADS") {
		Ok(v) if v == "1" => rayon::ThreadPoolBuilder::new()
			.num_threads(1)
			.use_current_thread()
			.build_global(),
		_ => Ok(()),
	})
}

/// Maps `f` over `items`, on the rayon pool when `parallel` is set and there is more than one
/// item, sequentially otherwise. Output order matches input order.
pub fn maybe_par_map<T, R, F>(items: Vec<T>, parallel: bool, f: F) -> Vec<R>
where
	T: Send,
	R: Send,
	F: Fn(T) -> R + Sync + Send,
{
	if parallel && items.len() > 1 {
		items.into_par_iter().map(f).collect()
	} else {
		items.into_iter().map(f).collect()
	}
}

/// Runs both closures, potentially in parallel.
pub fn maybe_join<A, B, RA, RB>(parallel: bool, a: A, b: B) -> (RA, RB)
where
	A: FnOnce() -> RA + Send,
	B: FnOnce() -> RB + Send,
	RA: Send,
	RB: Send,
{
	if parallel {
		rayon::join(a, b)
	} else {
		(a(), b())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_maybe_par_map_preserves_order() {
		let items = (0..64u64).collect::<Vec<_>>();
		let expected = items.iter().map(|x| x * x).collect::<Vec<_>>();
		assert_eq!(maybe_par_map(items.clone(), true, |x| x * x), expected);
		assert_eq!(maybe_par_map(items, false, |x| x * x), expected);
	}

	#[test]
	fn test_maybe_join() {
		assert_eq!(maybe_join(true, || 1, || "two"), (1, "two"));
		assert_eq!(maybe_join(false, || 1, || "two"), (1, "two"));
	}
}
