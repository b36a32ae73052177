//! Walkroute library entry points.
//!
//! This crate loads a walking-path network (from SQLite or a compiled
//! snapshot) into an immutable in-memory graph, snaps coordinates onto it
//! with a KD-tree, runs Dijkstra between the snapped nodes, and returns the
//! route geometry as points plus an encoded polyline. Front ends (the CLI)
//! should only depend on the functions exported here instead of
//! reimplementing behavior.

#![deny(warnings)]

pub mod coord;
pub mod db;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod path;
pub mod polyline;
pub mod routing;
pub mod snapshot;
pub mod spatial;
pub mod store;

pub use coord::{Coordinate, FixedCoordinate, EARTH_RADIUS_M};
pub use db::{load_graph, SqliteSource};
pub use error::{Endpoint, Error, ErrorKind, Result};
pub use geometry::assemble;
pub use graph::{Edge, EdgeDirection, EdgeId, Graph, Node, NodeId};
pub use path::{
    find_route, find_route_dijkstra, PathStep, SearchBudget, SearchOutcome, ShortestPath,
    DEFAULT_MAX_SETTLED,
};
pub use routing::{plan_route, PlannerOptions, Route, RoutePlanner};
pub use snapshot::{load_snapshot, save_snapshot, snapshot_path, SnapshotSource};
pub use spatial::{NodeIndex, Snap, SnapOptions, DEFAULT_MAX_SNAP_RADIUS_M};
pub use store::{GraphRecords, GraphSource, GraphStore, LoadedGraph};
