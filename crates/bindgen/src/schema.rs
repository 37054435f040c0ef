//! Centralized JSON-Schema → TypeScript type mapping.
//!
//! All binding text that mentions a type goes through [`ts_type`]; nothing
//! else in the generator builds type strings by hand.

use serde_json::Value;

/// Render the TypeScript type for an argument schema.
///
/// Unrecognized or missing schemas fall back to `unknown`.
pub fn ts_type(schema: &Value) -> String {
    // Closed value sets beat the declared primitive type.
    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        let literals: Vec<String> = options.iter().map(literal).collect();
        if !literals.is_empty() {
            return literals.join(" | ");
        }
    }

    match schema.get("type") {
        Some(Value::String(kind)) => scalar_or_composite(kind, schema),
        // Nullable unions like ["string", "null"].
        Some(Value::Array(kinds)) => {
            let parts: Vec<String> = kinds
                .iter()
                .filter_map(Value::as_str)
                .map(|kind| scalar_or_composite(kind, schema))
                .collect();
            if parts.is_empty() {
                "unknown".to_string()
            } else {
                parts.join(" | ")
            }
        }
        _ => "unknown".to_string(),
    }
}

fn scalar_or_composite(kind: &str, schema: &Value) -> String {
    match kind {
        "string" => "string".to_string(),
        "number" | "integer" => "number".to_string(),
        "boolean" => "boolean".to_string(),
        "null" => "null".to_string(),
        "array" => {
            let element = schema
                .get("items")
                .map(ts_type)
                .unwrap_or_else(|| "unknown".to_string());
            format!("Array<{}>", element)
        }
        "object" => object_shape(schema),
        _ => "unknown".to_string(),
    }
}

/// Render an object schema as an inline structural type.
///
/// Each property keeps its mapped type; properties not listed in `required`
/// are marked optional. Objects without declared properties stay open.
fn object_shape(schema: &Value) -> String {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return "Record<string, unknown>".to_string();
    };
    if properties.is_empty() {
        return "Record<string, unknown>".to_string();
    }

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let fields: Vec<String> = properties
        .iter()
        .map(|(name, prop)| {
            let marker = if required.contains(&name.as_str()) { "" } else { "?" };
            format!("{}{}: {}", name, marker, ts_type(prop))
        })
        .collect();

    format!("{{ {} }}", fields.join("; "))
}

/// Render one enum member as a TypeScript literal.
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// Properties of an object schema with their optionality, in declaration
/// order. Used for interface emission; the types come from [`ts_type`].
pub fn object_properties(schema: &Value) -> Vec<(String, Value, bool)> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| {
            let is_required = required.contains(&name.as_str());
            (name.clone(), prop.clone(), is_required)
        })
        .collect()
}
