use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::result::MetricMap;

/// The graph kinds one analysis can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphType {
    FileResultDependencyGraph,
    EntityResultDependencyGraph,
    EntityResultInheritanceGraph,
    EntityResultCompleteGraph,
    FilesystemGraph,
}

impl GraphType {
    pub const ALL: [GraphType; 5] = [
        GraphType::FileResultDependencyGraph,
        GraphType::EntityResultDependencyGraph,
        GraphType::EntityResultInheritanceGraph,
        GraphType::EntityResultCompleteGraph,
        GraphType::FilesystemGraph,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            GraphType::FileResultDependencyGraph => "file_result_dependency_graph",
            GraphType::EntityResultDependencyGraph => "entity_result_dependency_graph",
            GraphType::EntityResultInheritanceGraph => "entity_result_inheritance_graph",
            GraphType::EntityResultCompleteGraph => "entity_result_complete_graph",
            GraphType::FilesystemGraph => "filesystem_graph",
        }
    }

    /// Graphs whose nodes are file results (or filesystem paths).
    pub fn holds_file_nodes(&self) -> bool {
        matches!(
            self,
            GraphType::FileResultDependencyGraph | GraphType::FilesystemGraph
        )
    }

    /// The substring a Louvain metric key must carry to be attached to nodes
    /// of this graph. Keeps the three entity graphs from cross-polluting.
    pub fn louvain_key_gate(&self) -> Option<&'static str> {
        match self {
            GraphType::FileResultDependencyGraph | GraphType::EntityResultDependencyGraph => {
                Some("dependency")
            }
            GraphType::EntityResultInheritanceGraph => Some("inheritance"),
            GraphType::EntityResultCompleteGraph => Some("complete"),
            GraphType::FilesystemGraph => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemNodeKind {
    Directory,
    File,
}

/// One node of the filesystem tree. `absolute_name` is the parent-relative
/// key shared with the other graphs; file nodes carry their full text
/// content for the life of the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemNode {
    pub kind: FilesystemNodeKind,
    pub absolute_name: String,
    pub absolute_path: PathBuf,
    pub content: Option<String>,
}

/// Node payload: graph key, display name, directory/file flags for the
/// filesystem graph, and the metric attributes written during annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub name: String,
    pub display_name: String,
    pub directory: bool,
    pub file: bool,
    pub attributes: MetricMap,
}

impl NodeData {
    fn bare(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            directory: false,
            file: false,
            attributes: MetricMap::new(),
        }
    }
}

/// Serializable node-link form of one graph, used by the bundle and the
/// JSON exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDump {
    pub graph_type: GraphType,
    pub nodes: Vec<NodeData>,
    pub edges: Vec<(String, String)>,
}

/// A tagged directed graph over result unique names, with a name index and
/// the filesystem node map attached for the filesystem variant.
#[derive(Debug, Clone)]
pub struct GraphRepresentation {
    graph_type: GraphType,
    digraph: DiGraph<NodeData, ()>,
    indices: HashMap<String, NodeIndex>,
    pub filesystem_nodes: BTreeMap<String, FilesystemNode>,
}

impl GraphRepresentation {
    pub fn new(graph_type: GraphType) -> Self {
        Self {
            graph_type,
            digraph: DiGraph::new(),
            indices: HashMap::new(),
            filesystem_nodes: BTreeMap::new(),
        }
    }

    pub fn graph_type(&self) -> GraphType {
        self.graph_type
    }

    pub fn digraph(&self) -> &DiGraph<NodeData, ()> {
        &self.digraph
    }

    /// Add the node if missing and return its index.
    pub fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.digraph.add_node(NodeData::bare(name));
        self.indices.insert(name.to_string(), idx);
        idx
    }

    pub fn add_directory_node(&mut self, name: &str) -> NodeIndex {
        let idx = self.ensure_node(name);
        self.digraph[idx].directory = true;
        idx
    }

    pub fn add_file_node(&mut self, name: &str, display_name: &str) -> NodeIndex {
        let idx = self.ensure_node(name);
        self.digraph[idx].file = true;
        self.digraph[idx].display_name = display_name.to_string();
        idx
    }

    /// Add a directed edge, deduplicating parallel edges.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        self.digraph.update_edge(from_idx, to_idx, ());
    }

    /// Build a dependency graph: one node per result, one edge per recorded
    /// import. Missing targets become bare nodes so graphs stay closed under
    /// references.
    pub fn calculate_dependency_graph_from_results<'a>(
        &mut self,
        results: impl Iterator<Item = (&'a str, &'a [String])>,
    ) {
        for (unique_name, dependencies) in results {
            self.ensure_node(unique_name);
            for dependency in dependencies {
                self.add_edge(unique_name, dependency);
            }
        }
    }

    /// Union of the entity dependency and inheritance graphs. Must run after
    /// both inputs exist.
    pub fn calculate_complete_graph(
        &mut self,
        dependency_graph: &GraphRepresentation,
        inheritance_graph: &GraphRepresentation,
    ) {
        for source in [dependency_graph, inheritance_graph] {
            for node in source.digraph.node_weights() {
                self.ensure_node(&node.name);
            }
            for edge in source.digraph.edge_references() {
                let from = &source.digraph[edge.source()].name;
                let to = &source.digraph[edge.target()].name;
                self.add_edge(from, to);
            }
        }
    }

    /// Attach local metric values to nodes. File graphs never receive keys
    /// mentioning entities and entity graphs never receive keys mentioning
    /// files; Louvain keys are additionally gated by the graph-kind
    /// substring.
    pub fn add_local_metric_results_to_graph_nodes(
        &mut self,
        local_results: &BTreeMap<String, MetricMap>,
    ) {
        for (node_name, metric_map) in local_results {
            let Some(&idx) = self.indices.get(node_name) else {
                continue;
            };
            for (key, value) in metric_map {
                if self.metric_key_allowed(key) {
                    self.digraph[idx].attributes.insert(key.clone(), value.clone());
                }
            }
        }
    }

    fn metric_key_allowed(&self, key: &str) -> bool {
        let kind_allowed = if self.graph_type.holds_file_nodes() {
            !key.contains("entity")
        } else {
            !key.contains("file")
        };
        if !kind_allowed {
            return false;
        }
        if key.contains("louvain") {
            if let Some(gate) = self.graph_type.louvain_key_gate() {
                return key.contains(gate);
            }
        }
        true
    }

    pub fn node_count(&self) -> usize {
        self.digraph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.digraph.edge_count()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.indices.get(from), self.indices.get(to)) {
            (Some(&f), Some(&t)) => self.digraph.find_edge(f, t).is_some(),
            _ => false,
        }
    }

    pub fn in_degree(&self, name: &str) -> usize {
        self.indices
            .get(name)
            .map(|&idx| {
                self.digraph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn out_degree(&self, name: &str) -> usize {
        self.indices
            .get(name)
            .map(|&idx| {
                self.digraph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.digraph.node_weights()
    }

    pub fn node_attributes(&self, name: &str) -> Option<&MetricMap> {
        self.indices.get(name).map(|&idx| &self.digraph[idx].attributes)
    }

    /// Node names in insertion order (petgraph index order).
    pub fn node_names(&self) -> Vec<&str> {
        self.digraph
            .node_weights()
            .map(|n| n.name.as_str())
            .collect()
    }

    pub fn to_dump(&self) -> GraphDump {
        GraphDump {
            graph_type: self.graph_type,
            nodes: self.digraph.node_weights().cloned().collect(),
            edges: self
                .digraph
                .edge_references()
                .map(|e| {
                    (
                        self.digraph[e.source()].name.clone(),
                        self.digraph[e.target()].name.clone(),
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_results() -> Vec<(String, Vec<String>)> {
        vec![
            (
                "proj/a.js".to_string(),
                vec!["proj/b.js".to_string(), "vendor/x".to_string()],
            ),
            ("proj/b.js".to_string(), vec![]),
        ]
    }

    #[test]
    fn test_dependency_graph_closure() {
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        let results = file_results();
        graph.calculate_dependency_graph_from_results(
            results.iter().map(|(n, d)| (n.as_str(), d.as_slice())),
        );

        // the unresolved external target exists as a bare node
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_node("vendor/x"));
        assert!(graph.has_edge("proj/a.js", "proj/b.js"));
    }

    #[test]
    fn test_duplicate_edges_are_merged() {
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_complete_graph_is_union() {
        let mut dependency = GraphRepresentation::new(GraphType::EntityResultDependencyGraph);
        dependency.add_edge("A", "B");
        let mut inheritance = GraphRepresentation::new(GraphType::EntityResultInheritanceGraph);
        inheritance.add_edge("A", "C");

        let mut complete = GraphRepresentation::new(GraphType::EntityResultCompleteGraph);
        complete.calculate_complete_graph(&dependency, &inheritance);

        assert_eq!(complete.node_count(), 3);
        assert!(complete.has_edge("A", "B"));
        assert!(complete.has_edge("A", "C"));
    }

    #[test]
    fn test_metric_key_filters() {
        let mut local = BTreeMap::new();
        let mut map = MetricMap::new();
        map.insert("sloc-in-file".to_string(), serde_json::json!(10));
        map.insert("sloc-in-entity".to_string(), serde_json::json!(4));
        local.insert("node".to_string(), map);

        let mut file_graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        file_graph.ensure_node("node");
        file_graph.add_local_metric_results_to_graph_nodes(&local);
        let attrs = file_graph.node_attributes("node").unwrap();
        assert!(attrs.contains_key("sloc-in-file"));
        assert!(!attrs.contains_key("sloc-in-entity"));

        let mut entity_graph = GraphRepresentation::new(GraphType::EntityResultDependencyGraph);
        entity_graph.ensure_node("node");
        entity_graph.add_local_metric_results_to_graph_nodes(&local);
        let attrs = entity_graph.node_attributes("node").unwrap();
        assert!(attrs.contains_key("sloc-in-entity"));
        assert!(!attrs.contains_key("sloc-in-file"));
    }

    #[test]
    fn test_louvain_keys_gated_by_graph_kind() {
        let mut local = BTreeMap::new();
        let mut map = MetricMap::new();
        map.insert(
            "entity_result_dependency_graph_louvain-modularity-in-entity".to_string(),
            serde_json::json!(0),
        );
        map.insert(
            "entity_result_inheritance_graph_louvain-modularity-in-entity".to_string(),
            serde_json::json!(1),
        );
        local.insert("A".to_string(), map);

        let mut inheritance = GraphRepresentation::new(GraphType::EntityResultInheritanceGraph);
        inheritance.ensure_node("A");
        inheritance.add_local_metric_results_to_graph_nodes(&local);
        let attrs = inheritance.node_attributes("A").unwrap();
        assert!(attrs.contains_key("entity_result_inheritance_graph_louvain-modularity-in-entity"));
        assert!(!attrs.contains_key("entity_result_dependency_graph_louvain-modularity-in-entity"));
    }

    #[test]
    fn test_dump_round_trip() {
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        graph.add_edge("a", "b");
        let dump = graph.to_dump();
        let json = serde_json::to_string(&dump).unwrap();
        let back: GraphDump = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes.len(), 2);
        assert_eq!(back.edges, vec![("a".to_string(), "b".to_string())]);
    }
}
