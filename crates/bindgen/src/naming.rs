//! Tool-name normalization.
//!
//! Providers report tool names in arbitrary casing and with arbitrary
//! separators (`read-file`, `readFile`, `read.file`, `Read File`). Bindings
//! normalize them to snake_case callables and PascalCase `<Name>Args`
//! argument shapes.

/// Split a raw tool name into lowercase words.
///
/// Breaks on non-alphanumeric separators and on lower→upper camelCase
/// boundaries.
fn words(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in raw.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Normalize a tool name to its snake_case callable form.
pub fn callable_name(raw: &str) -> String {
    let joined = words(raw).join("_");
    if joined.is_empty() {
        return "_tool".to_string();
    }
    // TypeScript identifiers cannot start with a digit.
    if joined.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("_{}", joined)
    } else {
        joined
    }
}

/// Normalize a tool name to its paired `<Name>Args` shape name.
pub fn args_name(raw: &str) -> String {
    let mut pascal: String = words(raw)
        .iter()
        .map(|w| {
            let mut cs = w.chars();
            match cs.next() {
                Some(first) => first.to_uppercase().collect::<String>() + cs.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if pascal.is_empty() {
        pascal.push_str("Tool");
    }
    if pascal.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        pascal.insert(0, '_');
    }
    pascal.push_str("Args");
    pascal
}
