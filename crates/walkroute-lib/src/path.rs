use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::graph::{EdgeId, Graph, NodeId};

/// Default cap on settled nodes for a single search.
pub const DEFAULT_MAX_SETTLED: usize = 2_000_000;

/// How often (in settled nodes) the wall-clock limit is checked.
const DEADLINE_CHECK_INTERVAL: usize = 1024;

/// Limits that stop a search before it exhausts the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Maximum number of nodes popped from the queue.
    pub max_settled: Option<usize>,
    /// Maximum wall-clock time spent searching.
    pub time_limit: Option<Duration>,
}

impl SearchBudget {
    /// A budget that never stops the search.
    pub fn unlimited() -> Self {
        Self {
            max_settled: None,
            time_limit: None,
        }
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_settled: Some(DEFAULT_MAX_SETTLED),
            time_limit: None,
        }
    }
}

/// Edge used by a path together with the direction it was walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub edge: EdgeId,
    /// `true` when walked from the edge's `to` node towards its `from` node.
    pub reversed: bool,
}

/// Lowest-weight path between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortestPath {
    /// Sum of edge weights in meters.
    pub distance: f64,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<PathStep>,
}

/// Result of a single-pair search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(ShortestPath),
    /// The frontier emptied without reaching the destination.
    Unreachable,
    /// The search budget ran out first.
    BudgetExhausted { settled: usize },
}

impl SearchOutcome {
    /// The path, if one was found.
    pub fn into_path(self) -> Option<ShortestPath> {
        match self {
            SearchOutcome::Found(path) => Some(path),
            SearchOutcome::Unreachable | SearchOutcome::BudgetExhausted { .. } => None,
        }
    }
}

/// Find the lowest-weight route between `origin` and `destination` with no
/// search budget.
pub fn find_route(graph: &Graph, origin: NodeId, destination: NodeId) -> Option<ShortestPath> {
    find_route_dijkstra(graph, origin, destination, &SearchBudget::unlimited()).into_path()
}

/// Run Dijkstra's algorithm from `origin`, stopping as soon as
/// `destination` is settled.
///
/// Equal tentative distances are popped in ascending node id. A node's
/// predecessor only changes on a strictly shorter distance and adjacency is
/// scanned by target then edge id, so equal-cost alternatives always
/// resolve the same way.
pub fn find_route_dijkstra(
    graph: &Graph,
    origin: NodeId,
    destination: NodeId,
    budget: &SearchBudget,
) -> SearchOutcome {
    if !graph.contains_node(origin) || !graph.contains_node(destination) {
        return SearchOutcome::Unreachable;
    }

    if origin == destination {
        return SearchOutcome::Found(ShortestPath {
            distance: 0.0,
            nodes: vec![origin],
            edges: Vec::new(),
        });
    }

    let started = Instant::now();
    let mut distances: HashMap<NodeId, f64> = HashMap::new();
    let mut parents: HashMap<NodeId, (NodeId, PathStep)> = HashMap::new();
    let mut queue = BinaryHeap::new();
    let mut settled = 0usize;

    distances.insert(origin, 0.0);
    queue.push(QueueEntry::new(origin, 0.0));

    while let Some(entry) = queue.pop() {
        let current_distance = match distances.get(&entry.node) {
            Some(distance) if entry.cost.0 > *distance => continue,
            Some(distance) => *distance,
            None => continue,
        };

        if entry.node == destination {
            debug!(settled, distance = current_distance, "destination settled");
            return SearchOutcome::Found(reconstruct_path(
                &parents,
                origin,
                destination,
                current_distance,
            ));
        }

        settled += 1;
        if budget_exhausted(budget, settled, started) {
            debug!(settled, "search budget exhausted");
            return SearchOutcome::BudgetExhausted { settled };
        }

        for traversal in graph.neighbours(entry.node) {
            let next = traversal.target;
            let next_cost = current_distance + traversal.weight;
            if next_cost < *distances.get(&next).unwrap_or(&f64::INFINITY) {
                distances.insert(next, next_cost);
                parents.insert(
                    next,
                    (
                        entry.node,
                        PathStep {
                            edge: traversal.edge,
                            reversed: traversal.reversed,
                        },
                    ),
                );
                queue.push(QueueEntry::new(next, next_cost));
            }
        }
    }

    debug!(settled, "frontier exhausted without reaching destination");
    SearchOutcome::Unreachable
}

fn budget_exhausted(budget: &SearchBudget, settled: usize, started: Instant) -> bool {
    if let Some(limit) = budget.max_settled {
        if settled > limit {
            return true;
        }
    }

    if let Some(limit) = budget.time_limit {
        if settled % DEADLINE_CHECK_INTERVAL == 0 && started.elapsed() > limit {
            return true;
        }
    }

    false
}

fn reconstruct_path(
    parents: &HashMap<NodeId, (NodeId, PathStep)>,
    origin: NodeId,
    destination: NodeId,
    distance: f64,
) -> ShortestPath {
    let mut nodes = vec![destination];
    let mut edges = Vec::new();
    let mut current = destination;
    while current != origin {
        let Some(&(parent, step)) = parents.get(&current) else {
            break;
        };
        edges.push(step);
        nodes.push(parent);
        current = parent;
    }
    nodes.reverse();
    edges.reverse();

    ShortestPath {
        distance,
        nodes,
        edges,
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: NodeId,
    cost: FloatOrd,
}

impl QueueEntry {
    fn new(node: NodeId, cost: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by cost, then id.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::FixedCoordinate;
    use crate::graph::{Edge, EdgeDirection, Node};
    use EdgeDirection::{Bidirectional, Directed};

    fn line_graph(weights: &[(EdgeId, NodeId, NodeId, f64, EdgeDirection)]) -> Graph {
        let mut ids: Vec<NodeId> = weights.iter().flat_map(|w| [w.1, w.2]).collect();
        ids.sort_unstable();
        ids.dedup();
        let nodes = ids
            .into_iter()
            .map(|id| Node {
                id,
                position: FixedCoordinate::new(0, id * 1_000_000),
            })
            .collect();
        let edges = weights
            .iter()
            .map(|&(id, from, to, weight, direction)| Edge {
                id,
                from,
                to,
                weight,
                geometry: Vec::new(),
                direction,
            })
            .collect();
        Graph::from_parts(nodes, edges).expect("valid graph")
    }

    #[test]
    fn self_route_is_empty() {
        let graph = line_graph(&[(1, 1, 2, 4.0, Bidirectional)]);
        let path = find_route(&graph, 1, 1).expect("self route");
        assert_eq!(path.distance, 0.0);
        assert_eq!(path.nodes, vec![1]);
        assert!(path.edges.is_empty());
    }

    #[test]
    fn prefers_lighter_detour() {
        let graph = line_graph(&[
            (1, 1, 3, 10.0, Bidirectional),
            (2, 1, 2, 3.0, Bidirectional),
            (3, 2, 3, 4.0, Bidirectional),
        ]);
        let path = find_route(&graph, 1, 3).expect("route");
        assert_eq!(path.distance, 7.0);
        assert_eq!(path.nodes, vec![1, 2, 3]);
        assert_eq!(
            path.edges,
            vec![
                PathStep {
                    edge: 2,
                    reversed: false
                },
                PathStep {
                    edge: 3,
                    reversed: false
                },
            ]
        );
    }

    #[test]
    fn records_reversed_traversals() {
        let graph = line_graph(&[(5, 2, 1, 6.0, Bidirectional)]);
        let path = find_route(&graph, 1, 2).expect("route");
        assert_eq!(
            path.edges,
            vec![PathStep {
                edge: 5,
                reversed: true
            }]
        );
    }

    #[test]
    fn directed_edges_block_reverse_travel() {
        let graph = line_graph(&[(1, 1, 2, 1.0, Directed)]);
        assert!(find_route(&graph, 1, 2).is_some());
        assert_eq!(
            find_route_dijkstra(&graph, 2, 1, &SearchBudget::default()),
            SearchOutcome::Unreachable
        );
    }

    #[test]
    fn equal_cost_paths_resolve_by_lowest_ids() {
        // Two equal detours 1-2-4 and 1-3-4, plus parallel edges 4-5.
        let graph = line_graph(&[
            (10, 1, 3, 1.0, Bidirectional),
            (11, 3, 4, 1.0, Bidirectional),
            (12, 1, 2, 1.0, Bidirectional),
            (13, 2, 4, 1.0, Bidirectional),
            (21, 4, 5, 2.0, Bidirectional),
            (20, 4, 5, 2.0, Bidirectional),
        ]);

        let path = find_route(&graph, 1, 5).expect("route");
        assert_eq!(path.nodes, vec![1, 2, 4, 5]);
        assert_eq!(path.edges.last().map(|step| step.edge), Some(20));
    }

    #[test]
    fn unknown_nodes_are_unreachable() {
        let graph = line_graph(&[(1, 1, 2, 1.0, Bidirectional)]);
        assert_eq!(
            find_route_dijkstra(&graph, 1, 99, &SearchBudget::default()),
            SearchOutcome::Unreachable
        );
    }

    #[test]
    fn budget_stops_long_searches() {
        let edges: Vec<_> = (1..100)
            .map(|id| (id, id, id + 1, 1.0, Bidirectional))
            .collect();
        let graph = line_graph(&edges);
        let budget = SearchBudget {
            max_settled: Some(10),
            time_limit: None,
        };

        assert_eq!(
            find_route_dijkstra(&graph, 1, 100, &budget),
            SearchOutcome::BudgetExhausted { settled: 11 }
        );
        assert!(find_route_dijkstra(&graph, 1, 5, &budget)
            .into_path()
            .is_some());
    }
}
