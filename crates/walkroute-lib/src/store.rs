//! Process-lifetime graph cache.
//!
//! A [`GraphStore`] owns a [`GraphSource`] and builds the graph plus its
//! node index exactly once. Callers racing on the first [`GraphStore::load`]
//! block on the single in-flight build and then share the same
//! [`Arc<LoadedGraph>`]; later calls only clone the `Arc`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use walkroute_lib::{GraphStore, SqliteSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(GraphStore::new(SqliteSource::new("walkroute.db")));
//! let loaded = store.load()?;
//! println!("{} nodes", loaded.graph().node_count());
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::db::SqliteSource;
use crate::error::Result;
use crate::graph::{Edge, Graph, Node};
use crate::snapshot::{is_snapshot, SnapshotSource};
use crate::spatial::NodeIndex;

/// Backing storage a graph can be read from.
pub trait GraphSource: Send + Sync {
    /// Short human-readable description used in logs.
    fn describe(&self) -> String;

    /// Read and validate the full graph.
    fn read_graph(&self) -> Result<Graph>;
}

/// In-memory node and edge records.
#[derive(Debug, Clone, Default)]
pub struct GraphRecords {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSource for GraphRecords {
    fn describe(&self) -> String {
        format!(
            "records:{} nodes/{} edges",
            self.nodes.len(),
            self.edges.len()
        )
    }

    fn read_graph(&self) -> Result<Graph> {
        Graph::from_parts(self.nodes.clone(), self.edges.clone())
    }
}

/// Graph together with the spatial index built from it.
#[derive(Debug)]
pub struct LoadedGraph {
    graph: Graph,
    index: NodeIndex,
}

impl LoadedGraph {
    /// Build the node index for `graph`.
    pub fn new(graph: Graph) -> Self {
        let index = NodeIndex::build(&graph);
        Self { graph, index }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn index(&self) -> &NodeIndex {
        &self.index
    }
}

type GraphCell = OnceCell<Arc<LoadedGraph>>;

/// Lazily loaded, shareable graph cache.
pub struct GraphStore {
    source: Box<dyn GraphSource>,
    current: RwLock<Arc<GraphCell>>,
}

impl GraphStore {
    pub fn new(source: impl GraphSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            current: RwLock::new(Arc::new(GraphCell::new())),
        }
    }

    /// Open a graph file, picking the snapshot or SQLite reader by content.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if is_snapshot(path) {
            Self::new(SnapshotSource::new(path))
        } else {
            Self::new(SqliteSource::new(path))
        }
    }

    /// Description of the backing source.
    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Return the cached graph, building it on first use.
    ///
    /// A failed build caches nothing; the error is returned to every caller
    /// that was waiting on it and the next call attempts a fresh build.
    pub fn load(&self) -> Result<Arc<LoadedGraph>> {
        let cell = self.current_cell();
        cell.get_or_try_init(|| self.build().map(Arc::new))
            .map(Arc::clone)
    }

    /// Rebuild the graph and index from the source and swap them in.
    ///
    /// Holders of a previously returned `Arc` keep their snapshot.
    pub fn reload(&self) -> Result<Arc<LoadedGraph>> {
        let loaded = Arc::new(self.build()?);
        let cell = Arc::new(GraphCell::with_value(Arc::clone(&loaded)));
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = cell;
        info!(source = %self.source.describe(), "graph reloaded");
        Ok(loaded)
    }

    /// Returns true once a graph has been built successfully.
    pub fn is_loaded(&self) -> bool {
        self.current_cell().get().is_some()
    }

    fn current_cell(&self) -> Arc<GraphCell> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    fn build(&self) -> Result<LoadedGraph> {
        let description = self.source.describe();
        info!(source = %description, "loading graph");

        let graph = self.source.read_graph().map_err(|e| {
            error!(source = %description, error = %e, "failed to load graph");
            e
        })?;

        let loaded = LoadedGraph::new(graph);
        info!(
            nodes = loaded.graph.node_count(),
            edges = loaded.graph.edge_count(),
            indexed = loaded.index.len(),
            "graph ready"
        );
        Ok(loaded)
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("source", &self.source.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::FixedCoordinate;
    use crate::error::Error;
    use crate::graph::EdgeDirection;

    fn records() -> GraphRecords {
        GraphRecords {
            nodes: vec![
                Node {
                    id: 1,
                    position: FixedCoordinate::new(0, 0),
                },
                Node {
                    id: 2,
                    position: FixedCoordinate::new(0, 1_000_000),
                },
            ],
            edges: vec![Edge {
                id: 1,
                from: 1,
                to: 2,
                weight: 111.0,
                geometry: Vec::new(),
                direction: EdgeDirection::Bidirectional,
            }],
        }
    }

    #[test]
    fn test_load_caches_graph() {
        let store = GraphStore::new(records());
        assert!(!store.is_loaded());

        let first = store.load().expect("load");
        let second = store.load().expect("load");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(store.is_loaded());
        assert_eq!(first.index().len(), 2);
    }

    #[test]
    fn test_failed_load_caches_nothing() {
        let mut invalid = records();
        invalid.edges[0].to = 99;
        let store = GraphStore::new(invalid);

        assert!(matches!(
            store.load(),
            Err(Error::DanglingEdge { edge: 1, node: 99 })
        ));
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let store = GraphStore::new(records());
        let first = store.load().expect("load");
        let reloaded = store.reload().expect("reload");

        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert!(Arc::ptr_eq(&reloaded, &store.load().expect("load")));
        assert_eq!(first.graph().node_count(), 2);
    }

    #[test]
    fn test_open_missing_file_reports_not_found() {
        let store = GraphStore::open("/nonexistent/walkroute.db");
        assert!(matches!(store.load(), Err(Error::GraphNotFound { .. })));
    }
}
