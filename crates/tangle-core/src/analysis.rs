use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::graph::{FilesystemNode, GraphRepresentation, GraphType};
use crate::language::Language;
use crate::metrics::{Metric, MetricId, ResultFilter};
use crate::result::{MetricMap, ResultStore};
use crate::stats::{StatKey, Statistics};

/// The configuration and state envelope of one source analysis. Created
/// from the declarative configuration, it lives for exactly one run; nothing
/// is shared between runs.
#[derive(Debug)]
pub struct Analysis {
    // configuration
    pub analysis_name: String,
    pub project_name: String,
    pub source_directory: PathBuf,
    pub only_permit_languages: Vec<Language>,
    pub only_permit_file_extensions: Vec<String>,
    pub only_permit_files_matching_absolute_path: Vec<String>,
    pub ignore_directories_containing: Vec<String>,
    pub ignore_files_containing: Vec<String>,
    pub ignore_dependencies_containing: Vec<String>,
    pub ignore_entities_containing: Vec<String>,
    pub import_aliases: BTreeMap<String, String>,

    pub metrics_for_file_results: BTreeSet<MetricId>,
    pub metrics_for_entity_results: BTreeSet<MetricId>,
    pub requested_graphs: BTreeSet<GraphType>,
    pub file_scan_requested: bool,
    pub entity_scan_requested: bool,

    // export settings, consumed by the report crate
    pub export_directory: Option<PathBuf>,
    pub export_graphml: bool,
    pub export_dot: bool,
    pub export_json: bool,
    pub export_tabular_file: bool,
    pub export_tabular_console: bool,
    pub export_tabular_console_overall: bool,

    // state
    pub results: ResultStore,
    pub absolute_scanned_file_names: BTreeSet<String>,
    pub scanned_files_nodes_in_directories: BTreeMap<String, Vec<String>>,
    pub local_metric_results: BTreeMap<String, MetricMap>,
    pub overall_metric_results: MetricMap,
    pub graph_representations: BTreeMap<GraphType, GraphRepresentation>,
    pub statistics: Statistics,
    pub analysis_date: String,

    start_time: Option<Instant>,
    stop_time: Option<Instant>,
}

impl Analysis {
    pub fn new(analysis_name: &str, project_name: &str, source_directory: PathBuf) -> Self {
        Self {
            analysis_name: analysis_name.to_string(),
            project_name: project_name.to_string(),
            source_directory,
            only_permit_languages: Vec::new(),
            only_permit_file_extensions: Vec::new(),
            only_permit_files_matching_absolute_path: Vec::new(),
            ignore_directories_containing: Vec::new(),
            ignore_files_containing: Vec::new(),
            ignore_dependencies_containing: Vec::new(),
            ignore_entities_containing: Vec::new(),
            import_aliases: BTreeMap::new(),
            metrics_for_file_results: BTreeSet::new(),
            metrics_for_entity_results: BTreeSet::new(),
            requested_graphs: BTreeSet::new(),
            file_scan_requested: false,
            entity_scan_requested: false,
            export_directory: None,
            export_graphml: false,
            export_dot: false,
            export_json: false,
            export_tabular_file: false,
            export_tabular_console: false,
            export_tabular_console_overall: false,
            results: ResultStore::new(),
            absolute_scanned_file_names: BTreeSet::new(),
            scanned_files_nodes_in_directories: BTreeMap::new(),
            local_metric_results: BTreeMap::new(),
            overall_metric_results: MetricMap::new(),
            graph_representations: BTreeMap::new(),
            statistics: Statistics::new(),
            analysis_date: String::new(),
            start_time: None,
            stop_time: None,
        }
    }

    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
        self.analysis_date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    }

    pub fn stop_timer(&mut self) {
        self.stop_time = Some(Instant::now());
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => Some(stop.duration_since(start)),
            _ => None,
        }
    }

    pub fn contains_code_metrics(&self) -> bool {
        self.registered_metric_ids()
            .iter()
            .any(|id| !id.is_graph_metric())
    }

    pub fn contains_graph_metrics(&self) -> bool {
        self.registered_metric_ids()
            .iter()
            .any(|id| id.is_graph_metric())
    }

    fn registered_metric_ids(&self) -> BTreeSet<MetricId> {
        self.metrics_for_file_results
            .union(&self.metrics_for_entity_results)
            .copied()
            .collect()
    }

    /// Registered code metrics in their canonical calculation order.
    pub fn registered_code_metrics(&self) -> Vec<MetricId> {
        let registered = self.registered_metric_ids();
        MetricId::CODE_METRICS
            .iter()
            .copied()
            .filter(|id| registered.contains(id))
            .collect()
    }

    /// Registered graph metrics in their canonical calculation order.
    pub fn registered_graph_metrics(&self) -> Vec<MetricId> {
        let registered = self.registered_metric_ids();
        MetricId::GRAPH_METRICS
            .iter()
            .copied()
            .filter(|id| registered.contains(id))
            .collect()
    }

    /// Run one metric over the scopes it is registered for (file scope
    /// first), collect its outputs, and record its runtime.
    pub fn calculate_metric(&mut self, metric: &mut dyn Metric) {
        let start = Instant::now();

        if self.metrics_for_file_results.contains(&metric.id()) {
            metric.calculate(
                ResultFilter::FileResults,
                &mut self.results,
                &self.graph_representations,
            );
            let local = metric.take_local_data();
            self.collect_local_metric_results(local);
            let overall = metric.take_overall_data();
            self.collect_overall_metric_results(overall);
        }

        if self.metrics_for_entity_results.contains(&metric.id()) {
            metric.calculate(
                ResultFilter::EntityResults,
                &mut self.results,
                &self.graph_representations,
            );
            let local = metric.take_local_data();
            self.collect_local_metric_results(local);
            let overall = metric.take_overall_data();
            self.collect_overall_metric_results(overall);
        }

        self.statistics
            .add_prefixed_duration(metric.metric_name(), StatKey::Runtime, start.elapsed());
    }

    pub fn collect_local_metric_results(&mut self, results: BTreeMap<String, MetricMap>) {
        for (name, metric_map) in results {
            self.local_metric_results
                .entry(name)
                .or_default()
                .extend(metric_map);
        }
    }

    pub fn collect_overall_metric_results(&mut self, results: MetricMap) {
        self.overall_metric_results.extend(results);
    }

    pub fn create_graph_representation(&mut self, graph_type: GraphType) {
        self.graph_representations
            .entry(graph_type)
            .or_insert_with(|| GraphRepresentation::new(graph_type));
    }

    /// Build all requested graphs in dependency order: the dependency and
    /// inheritance graphs first, the complete graph (their union) last.
    pub fn calculate_graph_representations(&mut self) {
        let file_items: Vec<(String, Vec<String>)> = self
            .results
            .file_results()
            .map(|f| (f.unique_name.clone(), f.scanned_import_dependencies.clone()))
            .collect();
        let entity_dependency_items: Vec<(String, Vec<String>)> = self
            .results
            .entity_results()
            .map(|e| (e.unique_name.clone(), e.scanned_import_dependencies.clone()))
            .collect();
        let entity_inheritance_items: Vec<(String, Vec<String>)> = self
            .results
            .entity_results()
            .map(|e| {
                (
                    e.unique_name.clone(),
                    e.scanned_inheritance_dependencies.clone(),
                )
            })
            .collect();

        if self.requested_graphs.contains(&GraphType::FileResultDependencyGraph) {
            self.create_graph_representation(GraphType::FileResultDependencyGraph);
            let graph = self
                .graph_representations
                .get_mut(&GraphType::FileResultDependencyGraph)
                .expect("graph was just created");
            graph.calculate_dependency_graph_from_results(
                file_items.iter().map(|(n, d)| (n.as_str(), d.as_slice())),
            );
        }

        if self.requested_graphs.contains(&GraphType::EntityResultDependencyGraph) {
            self.create_graph_representation(GraphType::EntityResultDependencyGraph);
            let graph = self
                .graph_representations
                .get_mut(&GraphType::EntityResultDependencyGraph)
                .expect("graph was just created");
            graph.calculate_dependency_graph_from_results(
                entity_dependency_items
                    .iter()
                    .map(|(n, d)| (n.as_str(), d.as_slice())),
            );
        }

        if self.requested_graphs.contains(&GraphType::EntityResultInheritanceGraph) {
            self.create_graph_representation(GraphType::EntityResultInheritanceGraph);
            let graph = self
                .graph_representations
                .get_mut(&GraphType::EntityResultInheritanceGraph)
                .expect("graph was just created");
            graph.calculate_dependency_graph_from_results(
                entity_inheritance_items
                    .iter()
                    .map(|(n, d)| (n.as_str(), d.as_slice())),
            );
        }

        if self.requested_graphs.contains(&GraphType::EntityResultCompleteGraph) {
            let dependency = self
                .graph_representations
                .get(&GraphType::EntityResultDependencyGraph);
            let inheritance = self
                .graph_representations
                .get(&GraphType::EntityResultInheritanceGraph);
            if let (Some(dependency), Some(inheritance)) = (dependency, inheritance) {
                let mut complete = GraphRepresentation::new(GraphType::EntityResultCompleteGraph);
                complete.calculate_complete_graph(dependency, inheritance);
                self.graph_representations
                    .insert(GraphType::EntityResultCompleteGraph, complete);
            }
        }
    }

    /// Push every collected local metric value onto the nodes of every
    /// existing graph, subject to the per-graph key filters.
    pub fn add_local_metric_results_to_graphs(&mut self) {
        for graph in self.graph_representations.values_mut() {
            graph.add_local_metric_results_to_graph_nodes(&self.local_metric_results);
        }
    }

    pub fn file_extension_allowed(&self, extension: &str) -> bool {
        self.only_permit_file_extensions.is_empty()
            || self
                .only_permit_file_extensions
                .iter()
                .any(|e| e == extension)
    }

    /// Case-insensitive substring check against the dependency ignore list.
    pub fn is_dependency_in_ignore_list(&self, dependency: &str) -> bool {
        let lowered = dependency.to_lowercase();
        self.ignore_dependencies_containing
            .iter()
            .any(|ignored| lowered.contains(&ignored.to_lowercase()))
    }

    pub fn is_entity_in_ignore_list(&self, entity: &str) -> bool {
        self.ignore_entities_containing
            .iter()
            .any(|ignored| entity.contains(ignored.as_str()))
    }

    pub fn filesystem_graph(&self) -> Option<&GraphRepresentation> {
        self.graph_representations.get(&GraphType::FilesystemGraph)
    }

    /// Names of every directory node in the filesystem graph.
    pub fn filesystem_directory_nodes(&self) -> Vec<String> {
        self.filesystem_graph()
            .map(|g| {
                g.nodes()
                    .filter(|n| n.directory)
                    .map(|n| n.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Temporarily move the filesystem node map out so the scan loop can
    /// iterate file contents while parsers mutate the analysis.
    pub fn take_filesystem_nodes(&mut self) -> BTreeMap<String, FilesystemNode> {
        self.graph_representations
            .get_mut(&GraphType::FilesystemGraph)
            .map(|g| std::mem::take(&mut g.filesystem_nodes))
            .unwrap_or_default()
    }

    pub fn restore_filesystem_nodes(&mut self, nodes: BTreeMap<String, FilesystemNode>) {
        if let Some(graph) = self
            .graph_representations
            .get_mut(&GraphType::FilesystemGraph)
        {
            graph.filesystem_nodes = nodes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{EntityResult, FileResult, ScanResult};
    use crate::tokenizer::tokenize;

    fn analysis_with_results() -> Analysis {
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        let mut file = FileResult::new(
            "a.js",
            "proj/a.js",
            "/tmp/proj/a.js",
            "a.js",
            "",
            "JAVASCRIPT_PARSER",
            Language::JavaScript,
            tokenize("import b from './b';"),
            String::new(),
            String::new(),
        );
        file.add_import("proj/b.js".to_string());
        analysis.results.insert(ScanResult::File(file));
        analysis.results.insert(ScanResult::Entity(EntityResult {
            unique_name: "m.A".to_string(),
            entity_name: "A".to_string(),
            module_name: "m".to_string(),
            scanned_file_name: "A.java".to_string(),
            scanned_by: "JAVA_PARSER".to_string(),
            scanned_language: Language::Java,
            scanned_tokens: vec![],
            scanned_import_dependencies: vec!["m.B".to_string()],
            scanned_inheritance_dependencies: vec!["Base".to_string()],
            parent_file_unique_name: "proj/A.java".to_string(),
            metrics: MetricMap::new(),
        }));
        analysis
    }

    #[test]
    fn test_graph_building_order_and_closure() {
        let mut analysis = analysis_with_results();
        analysis.requested_graphs.insert(GraphType::FileResultDependencyGraph);
        analysis.requested_graphs.insert(GraphType::EntityResultDependencyGraph);
        analysis.requested_graphs.insert(GraphType::EntityResultInheritanceGraph);
        analysis.requested_graphs.insert(GraphType::EntityResultCompleteGraph);

        analysis.calculate_graph_representations();

        let file_graph = &analysis.graph_representations[&GraphType::FileResultDependencyGraph];
        assert!(file_graph.has_edge("proj/a.js", "proj/b.js"));

        let complete = &analysis.graph_representations[&GraphType::EntityResultCompleteGraph];
        assert!(complete.has_edge("m.A", "m.B"));
        assert!(complete.has_edge("m.A", "Base"));
    }

    #[test]
    fn test_complete_graph_needs_both_inputs() {
        let mut analysis = analysis_with_results();
        analysis.requested_graphs.insert(GraphType::EntityResultCompleteGraph);
        analysis.calculate_graph_representations();
        assert!(!analysis
            .graph_representations
            .contains_key(&GraphType::EntityResultCompleteGraph));
    }

    #[test]
    fn test_extension_permit_list() {
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        assert!(analysis.file_extension_allowed(".go"));
        analysis.only_permit_file_extensions = vec![".java".to_string()];
        assert!(analysis.file_extension_allowed(".java"));
        assert!(!analysis.file_extension_allowed(".go"));
    }

    #[test]
    fn test_dependency_ignore_list_is_case_insensitive() {
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        analysis.ignore_dependencies_containing = vec!["Vendor".to_string()];
        assert!(analysis.is_dependency_in_ignore_list("proj/vendor/pkg"));
        assert!(analysis.is_dependency_in_ignore_list("proj/VENDOR/pkg"));
        assert!(!analysis.is_dependency_in_ignore_list("proj/lib/pkg"));
    }

    #[test]
    fn test_collect_local_results_merges() {
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        let mut first = BTreeMap::new();
        let mut map = MetricMap::new();
        map.insert("sloc-in-file".to_string(), serde_json::json!(3));
        first.insert("a".to_string(), map);
        analysis.collect_local_metric_results(first);

        let mut second = BTreeMap::new();
        let mut map = MetricMap::new();
        map.insert("fan-in-dependency-graph".to_string(), serde_json::json!(1));
        second.insert("a".to_string(), map);
        analysis.collect_local_metric_results(second);

        let merged = &analysis.local_metric_results["a"];
        assert_eq!(merged.len(), 2);
    }
}
