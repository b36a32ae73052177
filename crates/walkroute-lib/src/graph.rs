use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::coord::FixedCoordinate;
use crate::error::{Error, Result};

/// Numeric identifier for a graph node.
pub type NodeId = i64;

/// Numeric identifier for a graph edge.
pub type EdgeId = i64;

/// Intersection or path vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: FixedCoordinate,
}

/// Whether an edge may be walked against its stored direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeDirection {
    Directed,
    Bidirectional,
}

/// Path segment between two nodes.
///
/// `geometry` runs from `from` to `to` and includes both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    /// Length in meters.
    pub weight: f64,
    pub geometry: Vec<FixedCoordinate>,
    pub direction: EdgeDirection,
}

/// One way of leaving a node along an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Traversal {
    pub edge: EdgeId,
    pub target: NodeId,
    pub weight: f64,
    /// `true` when the edge is walked from `to` back to `from`.
    pub reversed: bool,
}

/// Immutable path graph used by snapping and search.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Arc<HashMap<NodeId, Node>>,
    edges: Arc<HashMap<EdgeId, Edge>>,
    adjacency: Arc<HashMap<NodeId, Vec<Traversal>>>,
}

impl Graph {
    /// Validate records and build the adjacency lists.
    ///
    /// Rejects duplicate ids, out-of-range positions, edges whose endpoints
    /// are missing, weights that are negative or not finite, and geometry
    /// that has a single point or does not run from `from` to `to`. Empty
    /// geometry is replaced by the straight segment between the endpoints.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut node_map = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if !node.position.is_in_range() {
                return Err(Error::NodeOutOfRange {
                    id: node.id,
                    lat_e9: node.position.lat_e9,
                    lon_e9: node.position.lon_e9,
                });
            }
            match node_map.entry(node.id) {
                Entry::Occupied(_) => return Err(Error::DuplicateNode { id: node.id }),
                Entry::Vacant(slot) => {
                    slot.insert(node);
                }
            }
        }

        let mut edge_map = HashMap::with_capacity(edges.len());
        let mut adjacency: HashMap<NodeId, Vec<Traversal>> = HashMap::new();
        for mut edge in edges {
            let from = lookup_endpoint(&node_map, &edge, edge.from)?;
            let to = lookup_endpoint(&node_map, &edge, edge.to)?;

            if !edge.weight.is_finite() || edge.weight < 0.0 {
                return Err(Error::InvalidWeight {
                    edge: edge.id,
                    weight: edge.weight,
                });
            }

            match edge.geometry.len() {
                0 => edge.geometry = vec![from.position, to.position],
                1 => {
                    return Err(Error::InvalidGeometry {
                        edge: edge.id,
                        message: "geometry must contain at least two points".to_string(),
                    })
                }
                _ => check_geometry(&edge, from, to)?,
            }

            if edge_map.contains_key(&edge.id) {
                return Err(Error::DuplicateEdge { id: edge.id });
            }

            adjacency.entry(edge.from).or_default().push(Traversal {
                edge: edge.id,
                target: edge.to,
                weight: edge.weight,
                reversed: false,
            });
            if edge.direction == EdgeDirection::Bidirectional {
                adjacency.entry(edge.to).or_default().push(Traversal {
                    edge: edge.id,
                    target: edge.from,
                    weight: edge.weight,
                    reversed: true,
                });
            }

            edge_map.insert(edge.id, edge);
        }

        for traversals in adjacency.values_mut() {
            traversals.sort_by_key(|t| (t.target, t.edge, t.reversed));
        }

        Ok(Self {
            nodes: Arc::new(node_map),
            edges: Arc::new(edge_map),
            adjacency: Arc::new(adjacency),
        })
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Return the traversals leaving a node, ordered by target then edge id.
    pub fn neighbours(&self, node: NodeId) -> &[Traversal] {
        self.adjacency
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `true` when every edge can be walked both ways.
    pub fn is_undirected(&self) -> bool {
        self.edges
            .values()
            .all(|edge| edge.direction == EdgeDirection::Bidirectional)
    }
}

fn lookup_endpoint<'a>(
    nodes: &'a HashMap<NodeId, Node>,
    edge: &Edge,
    node: NodeId,
) -> Result<&'a Node> {
    nodes
        .get(&node)
        .ok_or(Error::DanglingEdge { edge: edge.id, node })
}

/// Stored geometry must start and end exactly on the edge's nodes, since
/// route assembly drops the first point of every edge after the first.
fn check_geometry(edge: &Edge, from: &Node, to: &Node) -> Result<()> {
    let invalid = |message: String| Error::InvalidGeometry {
        edge: edge.id,
        message,
    };

    if edge.geometry.first() != Some(&from.position) {
        return Err(invalid(format!("geometry does not start at node {}", from.id)));
    }
    if edge.geometry.last() != Some(&to.position) {
        return Err(invalid(format!("geometry does not end at node {}", to.id)));
    }
    if !edge.geometry.iter().all(FixedCoordinate::is_in_range) {
        return Err(invalid("geometry point out of range".to_string()));
    }
    Ok(())
}
