//! Environment variable parsing with warn-level logging for invalid values.

/// Parses an environment variable with a default fallback.
///
/// - Variable not set: returns `default` silently (the expected case).
/// - Variable set but unparsable: logs a warning and returns `default`.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    let Ok(raw) = std::env::var(var) else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(var, value = %raw, default = %default, "invalid env var value, using default");
            default
        },
    }
}
