// Copyright 2024-2025 Irreducible Inc.

/// Returns early with the given error converted via `Into`.
///
/// With the `bail_panic` feature enabled the error panics instead, which gives a backtrace at the
/// point of failure when debugging a protocol implementation.
#[cfg(feature = "bail_panic")]
#[macro_export]
macro_rules! bail {
	($err:expr) => {
		panic!("{}", $err);
	};
}

#[cfg(not(feature = "bail_panic"))]
#[macro_export]
macro_rules! bail {
	($err:expr) => {
		return Err($err.into());
	};
}

#[macro_export]
macro_rules! ensure {
	($cond:expr, $err:expr) => {
		if !$cond {
			$crate::bail!($err);
		}
	};
}

#[cfg(test)]
mod tests {
	#[derive(Debug, PartialEq, Eq, thiserror::Error)]
	enum TestError {
		#[error("value {0} is odd")]
		Odd(u32),
	}

	fn halve(value: u32) -> Result<u32, TestError> {
		ensure!(value % 2 == 0, TestError::Odd(value));
		Ok(value / 2)
	}

	#[test]
	#[cfg(not(feature = "bail_panic"))]
	fn test_ensure_returns_error() {
		assert_eq!(halve(4), Ok(2));
		assert_eq!(halve(5), Err(TestError::Odd(5)));
	}
}
