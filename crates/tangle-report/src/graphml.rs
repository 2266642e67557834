use std::collections::BTreeSet;

use tangle_core::graph::GraphDump;

/// Render one graph as GraphML: a `<key>` declaration per distinct node
/// attribute, nodes with `<data>` entries, directed edges.
pub fn format_graphml(dump: &GraphDump) -> String {
    let mut attribute_names: BTreeSet<&str> = BTreeSet::new();
    for node in &dump.nodes {
        for key in node.attributes.keys() {
            attribute_names.insert(key);
        }
    }
    let key_ids: Vec<(&str, String)> = attribute_names
        .iter()
        .enumerate()
        .map(|(index, name)| (*name, format!("d{index}")))
        .collect();

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
    for (name, id) in &key_ids {
        out.push_str(&format!(
            "  <key id=\"{id}\" for=\"node\" attr.name=\"{}\" attr.type=\"string\"/>\n",
            escape(name)
        ));
    }
    out.push_str(&format!(
        "  <graph id=\"{}\" edgedefault=\"directed\">\n",
        dump.graph_type.key()
    ));

    for node in &dump.nodes {
        if node.attributes.is_empty() {
            out.push_str(&format!("    <node id=\"{}\"/>\n", escape(&node.name)));
            continue;
        }
        out.push_str(&format!("    <node id=\"{}\">\n", escape(&node.name)));
        for (key, value) in &node.attributes {
            let id = key_ids
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, id)| id.as_str())
                .unwrap_or("d0");
            out.push_str(&format!(
                "      <data key=\"{id}\">{}</data>\n",
                escape(&render_value(value))
            ));
        }
        out.push_str("    </node>\n");
    }

    for (source, target) in &dump.edges {
        out.push_str(&format!(
            "    <edge source=\"{}\" target=\"{}\"/>\n",
            escape(source),
            escape(target)
        ));
    }

    out.push_str("  </graph>\n</graphml>\n");
    out
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_core::graph::{GraphRepresentation, GraphType};

    #[test]
    fn test_graphml_shape() {
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        graph.add_edge("a.js", "b.js");
        let xml = format_graphml(&graph.to_dump());

        assert!(xml.contains("<graphml"));
        assert!(xml.contains("edgedefault=\"directed\""));
        assert!(xml.contains("<node id=\"a.js\"/>"));
        assert!(xml.contains("<edge source=\"a.js\" target=\"b.js\"/>"));
    }

    #[test]
    fn test_attributes_become_data_entries() {
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        graph.ensure_node("a.js");
        let mut local = std::collections::BTreeMap::new();
        let mut metrics = tangle_core::result::MetricMap::new();
        metrics.insert("sloc-in-file".to_string(), serde_json::json!(10));
        local.insert("a.js".to_string(), metrics);
        graph.add_local_metric_results_to_graph_nodes(&local);

        let xml = format_graphml(&graph.to_dump());
        assert!(xml.contains("attr.name=\"sloc-in-file\""));
        assert!(xml.contains("<data key=\"d0\">10</data>"));
    }

    #[test]
    fn test_names_are_escaped() {
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        graph.ensure_node("a<b>.js");
        let xml = format_graphml(&graph.to_dump());
        assert!(xml.contains("a&lt;b&gt;.js"));
    }
}
