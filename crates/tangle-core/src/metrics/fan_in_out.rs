use serde_json::json;
use tracing::debug;

use crate::graph::GraphRepresentation;
use crate::metrics::{
    graph_kind_suffix, graphs_for_filter, record_local, GraphSet, LocalMetricData, Metric,
    MetricId, OverallMetricData, ResultFilter,
};
use crate::result::ResultStore;

/// Per-node in/out-degree over every provided graph, with average, maximum
/// and maximum-holder name per graph kind in the overall data.
pub struct FanInOutMetric {
    local_data: LocalMetricData,
    overall_data: OverallMetricData,
}

impl FanInOutMetric {
    pub fn new() -> Self {
        Self {
            local_data: LocalMetricData::new(),
            overall_data: OverallMetricData::new(),
        }
    }

    fn calculate_for_graph(&mut self, graph: &GraphRepresentation) {
        let Some(suffix) = graph_kind_suffix(graph.graph_type()) else {
            return;
        };
        if graph.node_count() == 0 {
            debug!("graph {} has no nodes, skipping fan-in/fan-out", graph.graph_type().key());
            return;
        }

        let fan_in_key = format!("fan-in-{suffix}");
        let fan_out_key = format!("fan-out-{suffix}");

        let mut total_in = 0usize;
        let mut total_out = 0usize;
        let mut max_in: (usize, &str) = (0, "");
        let mut max_out: (usize, &str) = (0, "");

        for node in graph.nodes() {
            let fan_in = graph.in_degree(&node.name);
            let fan_out = graph.out_degree(&node.name);

            record_local(&mut self.local_data, &node.name, &fan_in_key, json!(fan_in));
            record_local(&mut self.local_data, &node.name, &fan_out_key, json!(fan_out));

            total_in += fan_in;
            total_out += fan_out;
            if fan_in > max_in.0 || max_in.1.is_empty() {
                max_in = (fan_in, &node.name);
            }
            if fan_out > max_out.0 || max_out.1.is_empty() {
                max_out = (fan_out, &node.name);
            }
        }

        let node_count = graph.node_count() as f64;
        self.overall_data
            .insert(format!("avg-fan-in-{suffix}"), json!(total_in as f64 / node_count));
        self.overall_data
            .insert(format!("avg-fan-out-{suffix}"), json!(total_out as f64 / node_count));
        self.overall_data
            .insert(format!("max-fan-in-{suffix}"), json!(max_in.0));
        self.overall_data
            .insert(format!("max-fan-in-name-{suffix}"), json!(max_in.1));
        self.overall_data
            .insert(format!("max-fan-out-{suffix}"), json!(max_out.0));
        self.overall_data
            .insert(format!("max-fan-out-name-{suffix}"), json!(max_out.1));
    }
}

impl Default for FanInOutMetric {
    fn default() -> Self {
        Self::new()
    }
}

impl Metric for FanInOutMetric {
    fn id(&self) -> MetricId {
        MetricId::FanInOut
    }

    fn metric_name(&self) -> &'static str {
        "fan-in-out-metric"
    }

    fn pretty_metric_name(&self) -> &'static str {
        "fan in out metric"
    }

    fn calculate(&mut self, filter: ResultFilter, _results: &mut ResultStore, graphs: &GraphSet) {
        for graph in graphs_for_filter(graphs, filter) {
            self.calculate_for_graph(graph);
        }
    }

    fn take_local_data(&mut self) -> LocalMetricData {
        std::mem::take(&mut self.local_data)
    }

    fn take_overall_data(&mut self) -> OverallMetricData {
        std::mem::take(&mut self.overall_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphType;

    fn diamond() -> GraphSet {
        // a -> b, a -> c, b -> d, c -> d
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        graph.add_edge("a", "b");
        graph.add_edge("a", "c");
        graph.add_edge("b", "d");
        graph.add_edge("c", "d");
        let mut graphs = GraphSet::new();
        graphs.insert(GraphType::FileResultDependencyGraph, graph);
        graphs
    }

    #[test]
    fn test_degrees_per_node() {
        let graphs = diamond();
        let mut metric = FanInOutMetric::new();
        let mut store = ResultStore::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &graphs);

        let local = metric.take_local_data();
        assert_eq!(local["a"]["fan-out-dependency-graph"], json!(2));
        assert_eq!(local["a"]["fan-in-dependency-graph"], json!(0));
        assert_eq!(local["d"]["fan-in-dependency-graph"], json!(2));
        assert_eq!(local["d"]["fan-out-dependency-graph"], json!(0));
    }

    #[test]
    fn test_overall_averages_and_maxima() {
        let graphs = diamond();
        let mut metric = FanInOutMetric::new();
        let mut store = ResultStore::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &graphs);

        let overall = metric.take_overall_data();
        assert_eq!(overall["avg-fan-in-dependency-graph"], json!(1.0));
        assert_eq!(overall["avg-fan-out-dependency-graph"], json!(1.0));
        assert_eq!(overall["max-fan-in-dependency-graph"], json!(2));
        assert_eq!(overall["max-fan-in-name-dependency-graph"], json!("d"));
        assert_eq!(overall["max-fan-out-name-dependency-graph"], json!("a"));
    }

    #[test]
    fn test_empty_graph_is_skipped() {
        let mut graphs = GraphSet::new();
        graphs.insert(
            GraphType::FileResultDependencyGraph,
            GraphRepresentation::new(GraphType::FileResultDependencyGraph),
        );
        let mut metric = FanInOutMetric::new();
        let mut store = ResultStore::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &graphs);
        assert!(metric.take_overall_data().is_empty());
    }
}
