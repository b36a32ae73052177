use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::coord::Coordinate;
use crate::error::{Endpoint, Error, Result};
use crate::geometry::{assemble, to_degrees};
use crate::graph::NodeId;
use crate::path::{find_route_dijkstra, PathStep, SearchBudget, SearchOutcome};
use crate::polyline;
use crate::spatial::{Snap, SnapOptions};
use crate::store::{GraphStore, LoadedGraph};

/// Tunables applied to every request a planner serves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlannerOptions {
    pub snap: SnapOptions,
    pub budget: SearchBudget,
}

/// Walking route between two snapped coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Sum of edge weights along the route.
    pub distance_m: f64,
    pub origin: Snap,
    pub destination: Snap,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<PathStep>,
    pub points: Vec<Coordinate>,
    pub polyline: String,
}

impl Route {
    /// Number of edges walked.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Answers route requests against a shared [`GraphStore`].
///
/// Cloning is cheap and every clone shares the same store, so one planner
/// can be handed to as many worker threads as needed.
#[derive(Debug, Clone)]
pub struct RoutePlanner {
    store: Arc<GraphStore>,
    options: PlannerOptions,
}

impl RoutePlanner {
    pub fn new(store: Arc<GraphStore>, options: PlannerOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Plan a route between two coordinates, loading the graph on first use.
    pub fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route> {
        let loaded = self.store.load()?;
        plan_route(&loaded, origin, destination, &self.options)
    }

    /// Snap a single coordinate with the planner's snap options.
    pub fn snap(&self, coordinate: Coordinate, endpoint: Endpoint) -> Result<Snap> {
        let loaded = self.store.load()?;
        snap_endpoint(&loaded, coordinate, endpoint, &self.options.snap)
    }
}

/// Snap both coordinates, search, and build the route geometry.
///
/// The origin is snapped first, so a request where neither coordinate is
/// near the network reports the origin.
pub fn plan_route(
    loaded: &LoadedGraph,
    origin: Coordinate,
    destination: Coordinate,
    options: &PlannerOptions,
) -> Result<Route> {
    let origin_snap = snap_endpoint(loaded, origin, Endpoint::Origin, &options.snap)?;
    let destination_snap =
        snap_endpoint(loaded, destination, Endpoint::Destination, &options.snap)?;

    debug!(
        origin = origin_snap.node,
        destination = destination_snap.node,
        "searching for route"
    );

    let no_path = || Error::NoPathFound {
        origin: origin_snap.node,
        destination: destination_snap.node,
    };

    let path = match find_route_dijkstra(
        loaded.graph(),
        origin_snap.node,
        destination_snap.node,
        &options.budget,
    ) {
        SearchOutcome::Found(path) => path,
        SearchOutcome::Unreachable => return Err(no_path()),
        SearchOutcome::BudgetExhausted { settled } => {
            warn!(
                settled,
                origin = origin_snap.node,
                destination = destination_snap.node,
                "search budget exhausted before reaching destination"
            );
            return Err(no_path());
        }
    };

    let points = if path.edges.is_empty() {
        vec![origin_snap.position]
    } else {
        to_degrees(&assemble(loaded.graph(), &path.edges)?)
    };
    let polyline = polyline::encode(&points);

    debug!(
        distance_m = path.distance,
        edges = path.edges.len(),
        points = points.len(),
        "route assembled"
    );

    Ok(Route {
        distance_m: path.distance,
        origin: origin_snap,
        destination: destination_snap,
        nodes: path.nodes,
        edges: path.edges,
        points,
        polyline,
    })
}

fn snap_endpoint(
    loaded: &LoadedGraph,
    coordinate: Coordinate,
    endpoint: Endpoint,
    options: &SnapOptions,
) -> Result<Snap> {
    loaded
        .index()
        .snap(coordinate, options)
        .ok_or(Error::SnapFailed {
            endpoint,
            coordinate,
            max_radius_m: options.max_radius_m,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::FixedCoordinate;
    use crate::graph::{Edge, EdgeDirection, Graph, Node};
    use crate::store::GraphRecords;

    fn node(id: NodeId, lat: f64, lon: f64) -> Node {
        Node {
            id,
            position: FixedCoordinate::from_degrees(Coordinate::new(lat, lon)),
        }
    }

    fn edge(id: i64, from: NodeId, to: NodeId, weight: f64) -> Edge {
        Edge {
            id,
            from,
            to,
            weight,
            geometry: Vec::new(),
            direction: EdgeDirection::Bidirectional,
        }
    }

    fn records() -> GraphRecords {
        GraphRecords {
            nodes: vec![
                node(1, 51.5000, -0.1400),
                node(2, 51.5000, -0.1390),
                node(3, 51.5000, -0.1380),
                node(9, 51.6000, -0.2000),
            ],
            edges: vec![edge(10, 1, 2, 5.0), edge(11, 2, 3, 7.0)],
        }
    }

    fn loaded() -> LoadedGraph {
        let records = records();
        LoadedGraph::new(Graph::from_parts(records.nodes, records.edges).expect("valid graph"))
    }

    #[test]
    fn routes_along_chain() {
        let route = plan_route(
            &loaded(),
            Coordinate::new(51.5000, -0.14001),
            Coordinate::new(51.5000, -0.1380),
            &PlannerOptions::default(),
        )
        .expect("route");

        assert_eq!(route.distance_m, 12.0);
        assert_eq!(route.nodes, vec![1, 2, 3]);
        assert_eq!(route.edge_count(), 2);
        assert_eq!(route.points.len(), 3);
        assert_eq!(route.polyline, polyline::encode(&route.points));
    }

    #[test]
    fn self_route_has_single_point() {
        let route = plan_route(
            &loaded(),
            Coordinate::new(51.5, -0.139),
            Coordinate::new(51.5, -0.139),
            &PlannerOptions::default(),
        )
        .expect("route");

        assert_eq!(route.distance_m, 0.0);
        assert_eq!(route.nodes, vec![2]);
        assert!(route.edges.is_empty());
        assert_eq!(route.points, vec![route.origin.position]);
    }

    #[test]
    fn origin_is_reported_first_when_both_fail_to_snap() {
        let err = plan_route(
            &loaded(),
            Coordinate::new(10.0, 10.0),
            Coordinate::new(-10.0, -10.0),
            &PlannerOptions::default(),
        )
        .expect_err("snap failure");

        assert!(matches!(
            err,
            Error::SnapFailed {
                endpoint: Endpoint::Origin,
                ..
            }
        ));
    }

    #[test]
    fn disconnected_nodes_have_no_path() {
        let err = plan_route(
            &loaded(),
            Coordinate::new(51.5, -0.14),
            Coordinate::new(51.6, -0.2),
            &PlannerOptions::default(),
        )
        .expect_err("no path");

        assert!(matches!(
            err,
            Error::NoPathFound {
                origin: 1,
                destination: 9
            }
        ));
    }

    #[test]
    fn exhausted_budget_is_no_path() {
        let options = PlannerOptions {
            budget: SearchBudget {
                max_settled: Some(1),
                time_limit: None,
            },
            ..PlannerOptions::default()
        };
        let err = plan_route(
            &loaded(),
            Coordinate::new(51.5, -0.14),
            Coordinate::new(51.5, -0.138),
            &options,
        )
        .expect_err("budget");

        assert!(matches!(err, Error::NoPathFound { .. }));
    }

    #[test]
    fn planner_loads_store_lazily() {
        let store = Arc::new(GraphStore::new(records()));
        let planner = RoutePlanner::new(Arc::clone(&store), PlannerOptions::default());
        assert!(!store.is_loaded());

        let snap = planner
            .snap(Coordinate::new(51.5, -0.138), Endpoint::Destination)
            .expect("snap");
        assert_eq!(snap.node, 3);
        assert!(store.is_loaded());
    }
}
