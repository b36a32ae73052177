//! KD-tree spatial index over graph nodes for nearest-node snapping.
//!
//! Node positions are projected onto a sphere of radius [`EARTH_RADIUS_M`]
//! and stored as 3D Cartesian points. The straight-line (chord) distance
//! between two points on a sphere grows monotonically with their
//! great-circle distance, so the KD-tree's squared-Euclidean nearest
//! neighbour is also the great-circle nearest node. Reported distances are
//! haversine meters.
//!
//! # Example
//!
//! ```no_run
//! use walkroute_lib::{Coordinate, GraphStore, SnapOptions, SqliteSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = GraphStore::new(SqliteSource::new("walkroute.db"));
//! let loaded = store.load()?;
//! let snap = loaded
//!     .index()
//!     .snap(Coordinate::new(51.5014, -0.1419), &SnapOptions::default());
//! # Ok(())
//! # }
//! ```
//!
//! [`EARTH_RADIUS_M`]: crate::coord::EARTH_RADIUS_M

use std::collections::HashMap;

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use serde::Serialize;
use tracing::info;

use crate::coord::{Coordinate, FixedCoordinate};
use crate::graph::{Graph, NodeId};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Distances closer than this are treated as equal when breaking ties.
const TIE_TOLERANCE_M: f64 = 1e-6;

/// Default maximum snap distance for walking queries.
pub const DEFAULT_MAX_SNAP_RADIUS_M: f64 = 500.0;

/// Snapping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapOptions {
    /// Coordinates farther than this from every node do not snap.
    pub max_radius_m: f64,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            max_radius_m: DEFAULT_MAX_SNAP_RADIUS_M,
        }
    }
}

/// A coordinate resolved to a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snap {
    pub node: NodeId,
    /// Great-circle distance from the query to the node.
    pub distance_m: f64,
    /// Node position in degrees.
    pub position: Coordinate,
}

#[derive(Debug, Clone, Copy)]
struct IndexNode {
    node_id: NodeId,
    position: FixedCoordinate,
}

/// Immutable nearest-neighbour index built once per loaded graph.
pub struct NodeIndex {
    /// KD-tree over sphere-projected positions. Items index into `nodes`.
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    nodes: Vec<IndexNode>,
    id_to_index: HashMap<NodeId, usize>,
}

impl NodeIndex {
    /// Build the index from every node in the graph.
    pub fn build(graph: &Graph) -> Self {
        let mut nodes: Vec<IndexNode> = graph
            .nodes()
            .map(|node| IndexNode {
                node_id: node.id,
                position: node.position,
            })
            .collect();
        nodes.sort_by_key(|node| node.node_id);

        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        let mut id_to_index = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            tree.add(&node.position.to_degrees().to_cartesian(), index);
            id_to_index.insert(node.node_id, index);
        }

        info!(node_count = nodes.len(), "built node index");

        Self {
            tree,
            nodes,
            id_to_index,
        }
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the position of a node if indexed.
    pub fn position(&self, node_id: NodeId) -> Option<Coordinate> {
        self.id_to_index
            .get(&node_id)
            .map(|&idx| self.nodes[idx].position.to_degrees())
    }

    /// Snap a coordinate to its nearest node.
    ///
    /// Returns `None` when the index is empty or the nearest node lies
    /// beyond `options.max_radius_m`. Nodes at equal distance resolve to
    /// the lowest node id.
    pub fn snap(&self, coordinate: Coordinate, options: &SnapOptions) -> Option<Snap> {
        if self.nodes.is_empty() {
            return None;
        }

        let query = coordinate.to_cartesian();
        let nearest = self.tree.nearest_one::<SquaredEuclidean>(&query);

        // Gather everything at (nearly) the nearest chord distance so ties
        // resolve by id rather than by tree layout.
        let tie_radius = nearest.distance.sqrt() + TIE_TOLERANCE_M;
        let candidates = self
            .tree
            .within::<SquaredEuclidean>(&query, tie_radius * tie_radius);

        let best = candidates
            .iter()
            .map(|neighbour| self.to_snap(coordinate, neighbour.item))
            .chain(std::iter::once(self.to_snap(coordinate, nearest.item)))
            .min_by(|a, b| compare_snaps(a, b))?;

        (best.distance_m <= options.max_radius_m).then_some(best)
    }

    /// Find the `k` nearest nodes, ordered by distance then node id.
    pub fn nearest(&self, coordinate: Coordinate, k: usize) -> Vec<Snap> {
        if k == 0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let query = coordinate.to_cartesian();
        let mut results: Vec<Snap> = self
            .tree
            .nearest_n::<SquaredEuclidean>(&query, k)
            .into_iter()
            .map(|neighbour| self.to_snap(coordinate, neighbour.item))
            .collect();

        results.sort_by(compare_snaps);
        results
    }

    fn to_snap(&self, coordinate: Coordinate, index: usize) -> Snap {
        let node = &self.nodes[index];
        let position = node.position.to_degrees();
        Snap {
            node: node.node_id,
            distance_m: coordinate.haversine_distance(&position),
            position,
        }
    }
}

fn compare_snaps(a: &Snap, b: &Snap) -> std::cmp::Ordering {
    if (a.distance_m - b.distance_m).abs() <= TIE_TOLERANCE_M {
        a.node.cmp(&b.node)
    } else {
        a.distance_m.total_cmp(&b.distance_m)
    }
}

impl std::fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeIndex")
            .field("node_count", &self.nodes.len())
            .finish()
    }
}
