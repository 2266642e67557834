use std::collections::BTreeMap;

use petgraph::visit::EdgeRef;
use serde_json::json;
use tracing::debug;

use crate::graph::{GraphRepresentation, GraphType};
use crate::metrics::{
    graph_kind_suffix, graphs_for_filter, record_local, GraphSet, LocalMetricData, Metric,
    MetricId, OverallMetricData, ResultFilter,
};
use crate::result::ResultStore;

const OPTIMIZATION_RUNS: usize = 5;
const RESOLUTION: f64 = 1.5;

/// Louvain community detection over each graph's undirected projection.
///
/// The partition is computed five times; the reported community count and
/// modularity are the arithmetic means of the runs, which damps the visual
/// instability of order-sensitive partitions. Only the final run writes node
/// assignments, renumbered so that community `0` is the largest partition,
/// `1` the second largest, and so on.
pub struct LouvainModularityMetric {
    local_data: LocalMetricData,
    overall_data: OverallMetricData,
}

impl LouvainModularityMetric {
    pub fn new() -> Self {
        Self {
            local_data: LocalMetricData::new(),
            overall_data: OverallMetricData::new(),
        }
    }

    fn calculate_for_graph(&mut self, graph: &GraphRepresentation, results: &mut ResultStore) {
        let node_names = graph.node_names();
        let node_count = node_names.len();
        if node_count == 0 {
            debug!(
                "graph {} has no nodes, skipping louvain modularity",
                graph.graph_type().key()
            );
            return;
        }

        let projection = UndirectedProjection::of(graph);

        let mut sum_communities = 0u64;
        let mut sum_modularity = 0.0f64;
        let mut sum_biggest_five = [0u64; 5];
        let mut final_partition: Vec<u32> = Vec::new();

        for run in 0..OPTIMIZATION_RUNS {
            // the greedy pass is order-sensitive; rotating the visiting order
            // varies the partition between runs without an RNG
            let start = run * node_count / OPTIMIZATION_RUNS;
            let order: Vec<usize> = (start..node_count).chain(0..start).collect();

            let partition = projection.louvain(RESOLUTION, &order);
            let communities_found = partition.iter().copied().max().map(|c| c + 1).unwrap_or(0);
            let modularity = projection.modularity(&partition);

            sum_communities += communities_found as u64;
            sum_modularity += modularity;

            let mut sizes = community_sizes(&partition);
            sizes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            for (order_index, (_, size)) in sizes.iter().take(5).enumerate() {
                sum_biggest_five[order_index] += *size as u64;
            }

            if run == OPTIMIZATION_RUNS - 1 {
                final_partition = renumber_by_size(&partition, &sizes);
            }
        }

        self.write_node_assignments(graph, &node_names, &final_partition, results);

        let runs = OPTIMIZATION_RUNS as f64;
        let communities = (sum_communities as f64 / runs).round() as i64;
        let modularity = (((sum_modularity / runs) * 100.0).round() / 100.0).max(0.0);
        let distribution: BTreeMap<String, f64> = sum_biggest_five
            .iter()
            .enumerate()
            .map(|(index, sum)| {
                let share = (*sum as f64 / runs) / node_count as f64;
                (index.to_string(), (share * 100.0).round() / 100.0)
            })
            .collect();

        if let Some(suffix) = graph_kind_suffix(graph.graph_type()) {
            self.overall_data
                .insert(format!("louvain-communities-{suffix}"), json!(communities));
            self.overall_data
                .insert(format!("louvain-modularity-{suffix}"), json!(modularity));
            self.overall_data.insert(
                format!("louvain-biggest-communities-{suffix}"),
                json!(distribution),
            );
        }
    }

    fn write_node_assignments(
        &mut self,
        graph: &GraphRepresentation,
        node_names: &[&str],
        partition: &[u32],
        results: &mut ResultStore,
    ) {
        let graph_type = graph.graph_type();
        let file_key = format!("{}_louvain-modularity-in-file", graph_type.key());
        let entity_key = format!("{}_louvain-modularity-in-entity", graph_type.key());

        for (index, name) in node_names.iter().enumerate() {
            let community = partition[index];
            match results.get_mut(*name) {
                Some(result) => {
                    let key = if result.is_file() { &file_key } else { &entity_key };
                    result
                        .metrics_mut()
                        .insert(key.clone(), json!(community));
                    record_local(&mut self.local_data, name, key, json!(community));
                }
                None => {
                    // an unresolved dependency outside the analysis; its key
                    // follows the kind of nodes this graph holds
                    let key = match graph_type {
                        GraphType::FileResultDependencyGraph | GraphType::FilesystemGraph => {
                            &file_key
                        }
                        _ => &entity_key,
                    };
                    record_local(&mut self.local_data, name, key, json!(community));
                }
            }
        }
    }
}

impl Default for LouvainModularityMetric {
    fn default() -> Self {
        Self::new()
    }
}

impl Metric for LouvainModularityMetric {
    fn id(&self) -> MetricId {
        MetricId::LouvainModularity
    }

    fn metric_name(&self) -> &'static str {
        "louvain-modularity-metric"
    }

    fn pretty_metric_name(&self) -> &'static str {
        "louvain modularity metric"
    }

    fn calculate(&mut self, filter: ResultFilter, results: &mut ResultStore, graphs: &GraphSet) {
        for graph in graphs_for_filter(graphs, filter) {
            self.calculate_for_graph(graph, results);
        }
    }

    fn take_local_data(&mut self) -> LocalMetricData {
        std::mem::take(&mut self.local_data)
    }

    fn take_overall_data(&mut self) -> OverallMetricData {
        std::mem::take(&mut self.overall_data)
    }
}

/// Undirected weighted view of a directed graph: every directed edge
/// contributes weight 1.0 in both directions.
struct UndirectedProjection {
    adjacency: Vec<Vec<(usize, f64)>>,
    strengths: Vec<f64>,
    total_weight: f64,
}

impl UndirectedProjection {
    fn of(graph: &GraphRepresentation) -> Self {
        let digraph = graph.digraph();
        let n = digraph.node_count();
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut strengths = vec![0.0f64; n];

        for edge in digraph.edge_references() {
            let s = edge.source().index();
            let t = edge.target().index();
            let w = 1.0;
            adjacency[s].push((t, w));
            adjacency[t].push((s, w));
            strengths[s] += w;
            strengths[t] += w;
        }

        let total_weight = strengths.iter().sum::<f64>() / 2.0;
        Self {
            adjacency,
            strengths,
            total_weight,
        }
    }

    /// One greedy modularity-maximizing pass of local moves, visiting nodes
    /// in the given order until no move improves modularity. Returns a
    /// contiguous community id per node.
    fn louvain(&self, resolution: f64, order: &[usize]) -> Vec<u32> {
        let n = self.adjacency.len();
        if n == 0 {
            return Vec::new();
        }
        if self.total_weight == 0.0 {
            return (0..n as u32).collect();
        }

        let mut community: Vec<u32> = (0..n as u32).collect();
        let mut community_strength: Vec<f64> = self.strengths.clone();

        let m2 = 2.0 * self.total_weight;
        let mut improved = true;
        let mut iterations = 0;
        while improved && iterations < 100 {
            improved = false;
            iterations += 1;

            for &node in order {
                let current = community[node];
                let ki = self.strengths[node];

                let mut weights_to: BTreeMap<u32, f64> = BTreeMap::new();
                for &(neighbor, w) in &self.adjacency[node] {
                    *weights_to.entry(community[neighbor]).or_default() += w;
                }

                let w_current = weights_to.get(&current).copied().unwrap_or(0.0);
                let remove_cost = w_current / m2
                    - resolution * ki * (community_strength[current as usize] - ki) / (m2 * m2);

                let mut best = current;
                let mut best_gain = 0.0;
                for (&target, &w_target) in &weights_to {
                    if target == current {
                        continue;
                    }
                    let insert_cost = w_target / m2
                        - resolution * ki * community_strength[target as usize] / (m2 * m2);
                    let gain = insert_cost - remove_cost;
                    if gain > best_gain {
                        best_gain = gain;
                        best = target;
                    }
                }

                if best != current {
                    community_strength[current as usize] -= ki;
                    community_strength[best as usize] += ki;
                    community[node] = best;
                    improved = true;
                }
            }
        }

        make_contiguous(&mut community);
        community
    }

    /// Newman's modularity Q for a community assignment.
    fn modularity(&self, community: &[u32]) -> f64 {
        if self.total_weight == 0.0 {
            return 0.0;
        }
        let m2 = 2.0 * self.total_weight;
        let mut q = 0.0;
        for (i, neighbors) in self.adjacency.iter().enumerate() {
            for &(j, w) in neighbors {
                if community[i] == community[j] {
                    q += w - self.strengths[i] * self.strengths[j] / m2;
                }
            }
        }
        // every undirected edge appears twice in the adjacency list
        q / m2
    }
}

fn make_contiguous(community: &mut [u32]) {
    let mut remap: BTreeMap<u32, u32> = BTreeMap::new();
    let mut next = 0u32;
    for c in community.iter() {
        remap.entry(*c).or_insert_with(|| {
            let id = next;
            next += 1;
            id
        });
    }
    for c in community.iter_mut() {
        *c = remap[c];
    }
}

fn community_sizes(partition: &[u32]) -> Vec<(u32, usize)> {
    let mut sizes: BTreeMap<u32, usize> = BTreeMap::new();
    for &c in partition {
        *sizes.entry(c).or_default() += 1;
    }
    sizes.into_iter().collect()
}

/// Renumber so community `0` holds the largest partition, `1` the second
/// largest, and so on. `sizes_sorted` is (id, size) in descending size order.
fn renumber_by_size(partition: &[u32], sizes_sorted: &[(u32, usize)]) -> Vec<u32> {
    let remap: BTreeMap<u32, u32> = sizes_sorted
        .iter()
        .enumerate()
        .map(|(new_id, (old_id, _))| (*old_id, new_id as u32))
        .collect();
    partition.iter().map(|c| remap[c]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clique_graph(sizes: &[usize]) -> GraphRepresentation {
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        let mut node = 0usize;
        for (clique, &size) in sizes.iter().enumerate() {
            let names: Vec<String> = (0..size).map(|i| format!("c{clique}n{}", node + i)).collect();
            for i in 0..size {
                for j in (i + 1)..size {
                    graph.add_edge(&names[i], &names[j]);
                }
            }
            node += size;
        }
        graph
    }

    #[test]
    fn test_louvain_separates_cliques() {
        let graph = clique_graph(&[6, 3, 2]);
        let projection = UndirectedProjection::of(&graph);
        let order: Vec<usize> = (0..graph.node_count()).collect();
        let partition = projection.louvain(RESOLUTION, &order);

        let sizes = community_sizes(&partition);
        let mut size_values: Vec<usize> = sizes.iter().map(|(_, s)| *s).collect();
        size_values.sort_unstable();
        assert_eq!(size_values, vec![2, 3, 6]);
    }

    #[test]
    fn test_renumbering_orders_by_size() {
        let graph = clique_graph(&[6, 3, 2]);
        let mut graphs = GraphSet::new();
        graphs.insert(GraphType::FileResultDependencyGraph, graph);

        let mut metric = LouvainModularityMetric::new();
        let mut store = ResultStore::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &graphs);

        let local = metric.take_local_data();
        let key = "file_result_dependency_graph_louvain-modularity-in-file";
        let mut sizes: BTreeMap<u64, usize> = BTreeMap::new();
        for (_, metric_map) in &local {
            let community = metric_map[key].as_u64().unwrap();
            *sizes.entry(community).or_default() += 1;
        }
        assert_eq!(sizes[&0], 6);
        assert_eq!(sizes[&1], 3);
        assert_eq!(sizes[&2], 2);
    }

    #[test]
    fn test_modularity_positive_for_clustered_graph() {
        let graph = clique_graph(&[4, 4]);
        let projection = UndirectedProjection::of(&graph);
        let order: Vec<usize> = (0..graph.node_count()).collect();
        let partition = projection.louvain(RESOLUTION, &order);
        assert!(projection.modularity(&partition) > 0.3);
    }

    #[test]
    fn test_edgeless_graph_is_singletons() {
        let mut graph = GraphRepresentation::new(GraphType::FileResultDependencyGraph);
        graph.ensure_node("a");
        graph.ensure_node("b");
        let projection = UndirectedProjection::of(&graph);
        let partition = projection.louvain(RESOLUTION, &[0, 1]);
        assert_eq!(partition, vec![0, 1]);
    }

    #[test]
    fn test_overall_keys_present() {
        let graph = clique_graph(&[3, 2]);
        let mut graphs = GraphSet::new();
        graphs.insert(GraphType::FileResultDependencyGraph, graph);

        let mut metric = LouvainModularityMetric::new();
        let mut store = ResultStore::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &graphs);

        let overall = metric.take_overall_data();
        assert!(overall.contains_key("louvain-communities-dependency-graph"));
        assert!(overall.contains_key("louvain-modularity-dependency-graph"));
        assert!(overall.contains_key("louvain-biggest-communities-dependency-graph"));
        assert!(overall["louvain-modularity-dependency-graph"].as_f64().unwrap() >= 0.0);
    }
}
