use tangle_core::graph::GraphDump;

/// Render one graph in DOT form, node attributes included.
pub fn format_dot(dump: &GraphDump) -> String {
    let mut out = String::new();
    out.push_str(&format!("digraph {} {{\n", dump.graph_type.key()));

    for node in &dump.nodes {
        if node.attributes.is_empty() {
            out.push_str(&format!("  \"{}\";\n", escape(&node.name)));
        } else {
            let attributes: Vec<String> = node
                .attributes
                .iter()
                .map(|(key, value)| format!("\"{}\"=\"{}\"", escape(key), escape(&render(value))))
                .collect();
            out.push_str(&format!(
                "  \"{}\" [{}];\n",
                escape(&node.name),
                attributes.join(", ")
            ));
        }
    }
    for (source, target) in &dump.edges {
        out.push_str(&format!(
            "  \"{}\" -> \"{}\";\n",
            escape(source),
            escape(target)
        ));
    }
    out.push_str("}\n");
    out
}

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
