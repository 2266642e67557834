//! The metric engine.
//!
//! Metrics come in two kinds: code metrics operate on the tokens and sources
//! of results, graph metrics operate on one or more graph representations.
//! Each metric writes per-result local data and analysis-wide overall data;
//! the analysis collects both after every calculation and later pushes the
//! local values onto graph nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::{GraphRepresentation, GraphType};
use crate::result::{MetricMap, ResultStore};

pub mod fan_in_out;
pub mod louvain;
pub mod number_of_methods;
pub mod sloc;
pub mod tfidf;
pub mod whitespace;

pub use fan_in_out::FanInOutMetric;
pub use louvain::LouvainModularityMetric;
pub use number_of_methods::NumberOfMethodsMetric;
pub use sloc::SourceLinesOfCodeMetric;
pub use tfidf::TfidfMetric;
pub use whitespace::WhitespaceMetric;

/// Identity of a metric as referenced from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    NumberOfMethods,
    SourceLinesOfCode,
    WhitespaceComplexity,
    FanInOut,
    LouvainModularity,
    Tfidf,
}

impl MetricId {
    /// Code metrics in their calculation order, then graph metrics in theirs.
    pub const CODE_METRICS: [MetricId; 4] = [
        MetricId::NumberOfMethods,
        MetricId::SourceLinesOfCode,
        MetricId::WhitespaceComplexity,
        MetricId::Tfidf,
    ];
    pub const GRAPH_METRICS: [MetricId; 2] = [MetricId::FanInOut, MetricId::LouvainModularity];

    pub fn is_graph_metric(&self) -> bool {
        Self::GRAPH_METRICS.contains(self)
    }
}

/// Which slice of the result store a calculation pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFilter {
    FileResults,
    EntityResults,
}

pub type LocalMetricData = BTreeMap<String, MetricMap>;
pub type OverallMetricData = MetricMap;
pub type GraphSet = BTreeMap<GraphType, GraphRepresentation>;

pub trait Metric {
    fn id(&self) -> MetricId;

    /// Kebab-case name, used as the statistics runtime prefix.
    fn metric_name(&self) -> &'static str;

    fn pretty_metric_name(&self) -> &'static str;

    /// Run one calculation pass over the filtered results. Graph metrics
    /// read the graphs matching the filter; code metrics ignore `graphs`.
    /// Internal failures are logged and leave the outputs untouched.
    fn calculate(&mut self, filter: ResultFilter, results: &mut ResultStore, graphs: &GraphSet);

    fn take_local_data(&mut self) -> LocalMetricData;

    fn take_overall_data(&mut self) -> OverallMetricData;
}

pub fn instantiate(id: MetricId) -> Box<dyn Metric> {
    match id {
        MetricId::NumberOfMethods => Box::new(NumberOfMethodsMetric::new()),
        MetricId::SourceLinesOfCode => Box::new(SourceLinesOfCodeMetric::new()),
        MetricId::WhitespaceComplexity => Box::new(WhitespaceMetric::new()),
        MetricId::FanInOut => Box::new(FanInOutMetric::new()),
        MetricId::LouvainModularity => Box::new(LouvainModularityMetric::new()),
        MetricId::Tfidf => Box::new(TfidfMetric::new()),
    }
}

/// Merge one value into nested local data.
pub(crate) fn record_local(
    local: &mut LocalMetricData,
    unique_name: &str,
    key: &str,
    value: serde_json::Value,
) {
    local
        .entry(unique_name.to_string())
        .or_default()
        .insert(key.to_string(), value);
}

/// The graphs a graph metric operates on for a given filter, in a fixed
/// order: the file dependency graph for file passes; dependency, inheritance
/// and complete entity graphs for entity passes.
pub(crate) fn graphs_for_filter<'a>(
    graphs: &'a GraphSet,
    filter: ResultFilter,
) -> Vec<&'a GraphRepresentation> {
    let wanted: &[GraphType] = match filter {
        ResultFilter::FileResults => &[GraphType::FileResultDependencyGraph],
        ResultFilter::EntityResults => &[
            GraphType::EntityResultDependencyGraph,
            GraphType::EntityResultInheritanceGraph,
            GraphType::EntityResultCompleteGraph,
        ],
    };
    wanted.iter().filter_map(|t| graphs.get(t)).collect()
}

/// Overall-key suffix shared by the graph metrics: the file and entity
/// dependency graphs report under the same `dependency-graph` suffix.
pub(crate) fn graph_kind_suffix(graph_type: GraphType) -> Option<&'static str> {
    match graph_type {
        GraphType::FileResultDependencyGraph | GraphType::EntityResultDependencyGraph => {
            Some("dependency-graph")
        }
        GraphType::EntityResultInheritanceGraph => Some("inheritance-graph"),
        GraphType::EntityResultCompleteGraph => Some("complete-graph"),
        GraphType::FilesystemGraph => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_kinds() {
        assert!(MetricId::FanInOut.is_graph_metric());
        assert!(MetricId::LouvainModularity.is_graph_metric());
        assert!(!MetricId::SourceLinesOfCode.is_graph_metric());
        assert!(!MetricId::Tfidf.is_graph_metric());
    }

    #[test]
    fn test_instantiate_names_are_kebab() {
        for id in MetricId::CODE_METRICS.iter().chain(MetricId::GRAPH_METRICS.iter()) {
            let metric = instantiate(*id);
            assert!(!metric.metric_name().contains(' '));
            assert!(metric.metric_name().ends_with("-metric"));
        }
    }

    #[test]
    fn test_graph_kind_suffix() {
        assert_eq!(
            graph_kind_suffix(GraphType::FileResultDependencyGraph),
            Some("dependency-graph")
        );
        assert_eq!(
            graph_kind_suffix(GraphType::EntityResultCompleteGraph),
            Some("complete-graph")
        );
        assert_eq!(graph_kind_suffix(GraphType::FilesystemGraph), None);
    }
}
