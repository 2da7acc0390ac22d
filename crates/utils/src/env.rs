// Copyright 2024-2025 Irreducible Inc.

use std::str::FromStr;

/// Read boolean flag from the environment variable.
pub fn boolean_env_flag_set(flag: &str) -> bool {
	match std::env::var(flag) {
		Ok(val) => ["1", "on", "ON", "true", "TRUE", "yes", "YES"].contains(&val.as_str()),
		Err(_) => false,
	}
}

/// Read and parse a value from the environment variable.
///
/// Returns `None` when the variable is unset or cannot be parsed; a malformed value is logged
/// rather than treated as fatal.
pub fn parsed_env_value<T: FromStr>(name: &str) -> Option<T> {
	let raw = std::env::var(name).ok()?;
	match raw.trim().parse() {
		Ok(value) => Some(value),
		Err(_) => {
			tracing::warn!(name, value = raw.as_str(), "ignoring malformed environment value");
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unset_flag_is_false() {
		assert!(!boolean_env_flag_set("ALGEBRIX_TEST_SURELY_UNSET_FLAG"));
		assert_eq!(parsed_env_value::<usize>("ALGEBRIX_TEST_SURELY_UNSET_FLAG"), None);
	}
}
