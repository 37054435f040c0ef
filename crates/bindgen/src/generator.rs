//! TypeScript binding emission.

use std::collections::HashSet;

use agentbox_core::types::ToolDescriptor;

use crate::naming::{args_name, callable_name};
use crate::schema::{object_properties, ts_type};

/// Inputs for one capability's binding generation.
#[derive(Debug, Clone)]
pub struct BindingSpec<'a> {
    /// Capability id, used in the relay path.
    pub capability_id: &'a str,
    /// Module name submissions import the binding under.
    pub module_name: &'a str,
    /// Port the relay bound; baked into the generated source.
    pub relay_port: u16,
    /// The provider's tool catalog.
    pub tools: &'a [ToolDescriptor],
}

/// Generated callable source plus its signature-only declaration artifact.
#[derive(Debug, Clone)]
pub struct GeneratedBinding {
    pub capability_id: String,
    pub module_name: String,
    /// Executable TypeScript module (`index.ts`).
    pub source: String,
    /// Ambient-module declaration (`index.d.ts`) for tooling that introspects
    /// the callable surface without running anything.
    pub declaration: String,
}

/// Generate bindings for one capability.
///
/// Pure function of its inputs; writing the result to disk is the caller's
/// responsibility.
pub fn generate(spec: &BindingSpec<'_>) -> GeneratedBinding {
    let mut source = String::new();
    let mut declaration = String::new();

    source.push_str(&format!(
        "// Generated by agentbox for capability \"{}\". Regenerated on every reload; edits will be lost.\n\n",
        spec.capability_id
    ));
    source.push_str(&format!(
        "const RELAY_URL = \"http://127.0.0.1:{}/call/{}\";\n\n",
        spec.relay_port, spec.capability_id
    ));
    source.push_str(concat!(
        "type RelayReply = { success: boolean; result?: unknown; error?: string };\n",
        "\n",
        "async function invoke(toolName: string, args: unknown): Promise<unknown> {\n",
        "  const response = await fetch(RELAY_URL, {\n",
        "    method: \"POST\",\n",
        "    headers: { \"content-type\": \"application/json\" },\n",
        "    body: JSON.stringify({ toolName, arguments: args ?? {} }),\n",
        "  });\n",
        "  const reply = (await response.json()) as RelayReply;\n",
        "  if (!response.ok || !reply.success) {\n",
        "    throw new Error(\n",
        "      `${toolName} failed: ${reply.error ?? `relay status ${response.status}`}`,\n",
        "    );\n",
        "  }\n",
        "  return reply.result;\n",
        "}\n\n",
    ));

    declaration.push_str(&format!(
        "// Type declarations for capability module \"{}\".\n",
        spec.module_name
    ));
    declaration.push_str(&format!("declare module \"{}\" {{\n", spec.module_name));

    let mut seen = HashSet::new();
    for tool in spec.tools {
        let base_callable = callable_name(&tool.name);
        let shape_stem = {
            let full = args_name(&tool.name);
            full[..full.len() - "Args".len()].to_string()
        };

        // Distinct raw names can normalize to the same identifier.
        let mut callable = base_callable.clone();
        let mut shape = format!("{}Args", shape_stem);
        let mut n = 2;
        while !seen.insert(callable.clone()) {
            callable = format!("{}_{}", base_callable, n);
            shape = format!("{}{}Args", shape_stem, n);
            n += 1;
        }

        emit_tool(&mut source, &mut declaration, tool, &callable, &shape);
    }

    declaration.push_str("}\n");

    GeneratedBinding {
        capability_id: spec.capability_id.to_string(),
        module_name: spec.module_name.to_string(),
        source,
        declaration,
    }
}

fn emit_tool(
    source: &mut String,
    declaration: &mut String,
    tool: &ToolDescriptor,
    callable: &str,
    shape: &str,
) {
    let properties = object_properties(&tool.input_schema);

    if properties.is_empty() {
        // Unrecognized or missing schema: generic unconstrained shape.
        source.push_str(&format!(
            "export type {} = Record<string, unknown>;\n\n",
            shape
        ));
        declaration.push_str(&format!(
            "  export type {} = Record<string, unknown>;\n",
            shape
        ));
    } else {
        if !tool.description.is_empty() {
            source.push_str(&format!("/** {} */\n", comment_safe(&tool.description)));
        }
        source.push_str(&format!("export interface {} {{\n", shape));
        declaration.push_str(&format!("  export interface {} {{\n", shape));

        for (name, prop_schema, required) in &properties {
            if let Some(description) = prop_schema.get("description").and_then(|d| d.as_str()) {
                source.push_str(&format!("  /** {} */\n", comment_safe(description)));
            }
            let marker = if *required { "" } else { "?" };
            let field = format!("{}{}: {};\n", name, marker, ts_type(prop_schema));
            source.push_str(&format!("  {}", field));
            declaration.push_str(&format!("    {}", field));
        }

        source.push_str("}\n\n");
        declaration.push_str("  }\n");
    }

    if !tool.description.is_empty() {
        source.push_str(&format!("/** {} */\n", comment_safe(&tool.description)));
    }
    source.push_str(&format!(
        "export async function {}(args: {}): Promise<unknown> {{\n  return invoke({}, args);\n}}\n\n",
        callable,
        shape,
        serde_json::to_string(&tool.name).unwrap_or_else(|_| "\"\"".into()),
    ));
    declaration.push_str(&format!(
        "  export function {}(args: {}): Promise<unknown>;\n",
        callable, shape
    ));
}

/// Keep provider-supplied text from terminating the comment block.
fn comment_safe(text: &str) -> String {
    text.replace("*/", "*\\/").replace('\n', " ")
}
