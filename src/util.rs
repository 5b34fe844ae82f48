//! Shared utility functions used across the codebase.

use crate::config::ConfigError;

/// Read an environment variable, treating unset and blank values alike.
pub fn env_var_nonempty(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

/// Parse an environment variable, returning `default` if unset or blank.
pub fn env_var_parse<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var_nonempty(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Mask a secret for display: `"********"` when present, `"Not Set"` otherwise.
pub fn mask_secret(secret: Option<&str>) -> &'static str {
    if secret.is_some() {
        "********"
    } else {
        "Not Set"
    }
}

/// Truncate a string to at most `max_chars` characters, appending `…` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
