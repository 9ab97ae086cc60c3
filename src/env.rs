//! Settings read from environment variables.
//!
//! Each setting is parsed by a function returning `None` for invalid values.
//! Unset and empty variables are treated the same, and invalid values are
//! logged and ignored so that the built-in default applies.

/// Read the environment variable `name` and parse it with `parse`.
pub fn env_setting<T>(name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let value = std::env::var(name).ok();
    parse_setting(name, value.as_deref(), parse)
}

fn parse_setting<T>(
    name: &str,
    value: Option<&str>,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    let parsed = parse(value);
    if parsed.is_none() {
        tracing::warn!(var = name, value, "ignoring invalid environment setting");
    }
    parsed
}

/// Parse a boolean switch such as "1", "off" or "Yes". Case-insensitive.
pub fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a thread count, which must be positive.
pub fn parse_thread_count(value: &str) -> Option<usize> {
    value.parse().ok().filter(|&n| n > 0)
}

/// Parse a name which can be used as an identifier in printed IR.
pub fn parse_identifier(value: &str) -> Option<String> {
    let mut chars = value.chars();
    let first = chars.next()?;
    let valid = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| value.to_string())
}
