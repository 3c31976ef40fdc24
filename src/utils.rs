use std::env::var;
use std::str::FromStr;

use anyhow::Context;
use anyhow::Result;

/// Get the value of ENV var, if any
///
/// Only when:
/// - It is set
/// - It is not empty
pub fn env_var(var_name: &'static str) -> Option<String> {
    var(var_name).ok().filter(|value| !value.is_empty())
}

/// Get the value of ENV var, or a default
///
/// Only when:
/// - It is set
/// - It is not empty
pub fn env_var_or_else(var_name: &'static str, or_else: fn() -> String) -> String {
    env_var(var_name).unwrap_or_else(or_else)
}

/// Parse the value of ENV var, or use a default when it is not set
pub fn env_var_parsed_or<T>(var_name: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(var_name).map_or(Ok(default), |value| {
        value
            .parse::<T>()
            .with_context(|| format!("`{var_name}` has an invalid value: {value:?}"))
    })
}

/// Read a boolean flag from the environment
///
/// `true`, `1` and `yes` (case insensitive) are truthy, everything else is not
pub fn env_flag(var_name: &'static str) -> bool {
    env_var(var_name).is_some_and(|value| {
        matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
    })
}
