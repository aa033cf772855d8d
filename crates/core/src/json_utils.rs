//! JSON utility functions shared across crates.

/// Strips a markdown code fence from oracle output.
///
/// Oracles occasionally wrap the requested JSON object in ```` ```json ````
/// fences despite the response-format contract. Returns the inner content
/// when a complete fence is present, the trimmed input otherwise.
#[must_use]
pub fn strip_markdown_json(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}
