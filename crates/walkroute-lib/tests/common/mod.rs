//! Common test utilities and fixture helpers.
//!
//! Fixtures are SQLite databases created on the fly inside a temporary
//! directory, so every test owns its own file.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tempfile::TempDir;
use walkroute_lib::{Edge, EdgeDirection, FixedCoordinate, Graph, Node, NodeId};

/// Nodes plus edges with inline JSON geometry and a direction flag.
#[allow(dead_code)]
pub const INLINE_SCHEMA: &str = "
    CREATE TABLE nodes (id INTEGER PRIMARY KEY, lat_e9 INTEGER NOT NULL, lon_e9 INTEGER NOT NULL);
    CREATE TABLE edges (
        id INTEGER PRIMARY KEY,
        from_node INTEGER NOT NULL,
        to_node INTEGER NOT NULL,
        weight REAL NOT NULL,
        geometry TEXT,
        bidirectional INTEGER
    );
";

/// Edges without geometry; shapes live in `edge_points`.
#[allow(dead_code)]
pub const POINT_TABLE_SCHEMA: &str = "
    CREATE TABLE nodes (id INTEGER PRIMARY KEY, lat_e9 INTEGER NOT NULL, lon_e9 INTEGER NOT NULL);
    CREATE TABLE edges (
        id INTEGER PRIMARY KEY,
        from_node INTEGER NOT NULL,
        to_node INTEGER NOT NULL,
        weight REAL NOT NULL
    );
    CREATE TABLE edge_points (edge_id INTEGER NOT NULL, seq INTEGER NOT NULL, lat_e9 INTEGER NOT NULL, lon_e9 INTEGER NOT NULL);
";

/// Chain fixture node ids.
#[allow(dead_code)]
pub const A: NodeId = 1;
#[allow(dead_code)]
pub const B: NodeId = 2;
#[allow(dead_code)]
pub const C: NodeId = 3;
/// Isolated node far from the chain.
#[allow(dead_code)]
pub const D: NodeId = 4;

/// Temporary SQLite database that is removed on drop.
#[allow(dead_code)]
pub struct FixtureDb {
    temp_dir: TempDir,
    path: PathBuf,
    connection: Connection,
}

#[allow(dead_code)]
impl FixtureDb {
    /// Create a database and run `schema` against it.
    pub fn new(schema: &str) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("walkroute.db");
        let connection = Connection::open(&path).expect("create database");
        connection.execute_batch(schema).expect("apply schema");
        Self {
            temp_dir,
            path,
            connection,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the database lives in, for sibling output files.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn node(&self, id: NodeId, lat: f64, lon: f64) -> &Self {
        self.connection
            .execute(
                "INSERT INTO nodes (id, lat_e9, lon_e9) VALUES (?1, ?2, ?3)",
                params![id, e9(lat), e9(lon)],
            )
            .expect("insert node");
        self
    }

    /// Insert an edge into the inline schema.
    pub fn edge(
        &self,
        id: i64,
        from: NodeId,
        to: NodeId,
        weight: f64,
        geometry: Option<&str>,
        bidirectional: bool,
    ) -> &Self {
        self.connection
            .execute(
                "INSERT INTO edges (id, from_node, to_node, weight, geometry, bidirectional)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, from, to, weight, geometry, bidirectional],
            )
            .expect("insert edge");
        self
    }

    pub fn execute(&self, sql: &str) -> &Self {
        self.connection.execute_batch(sql).expect("execute sql");
        self
    }
}

/// Degrees to the stored fixed-point representation.
#[allow(dead_code)]
pub fn e9(degrees: f64) -> i64 {
    (degrees * 1e9).round() as i64
}

/// JSON geometry column value for a list of `(lat, lon)` degrees.
#[allow(dead_code)]
pub fn geometry_json(points: &[(f64, f64)]) -> String {
    let items: Vec<String> = points
        .iter()
        .map(|(lat, lon)| format!(r#"{{"lat":{},"lon":{}}}"#, e9(*lat), e9(*lon)))
        .collect();
    format!("[{}]", items.join(","))
}

/// A -5- B -7- C along a street, plus an unconnected node D about 1.5 km
/// north. B -> C carries a bend in its stored geometry.
#[allow(dead_code)]
pub fn chain_db() -> FixtureDb {
    let db = FixtureDb::new(INLINE_SCHEMA);
    db.node(A, 51.5000, -0.1400)
        .node(B, 51.5000, -0.1390)
        .node(C, 51.5000, -0.1380)
        .node(D, 51.5140, -0.1390)
        .edge(10, A, B, 5.0, None, true)
        .edge(
            11,
            B,
            C,
            7.0,
            Some(&geometry_json(&[
                (51.5000, -0.1390),
                (51.5002, -0.1385),
                (51.5000, -0.1380),
            ])),
            true,
        );
    db
}

/// Square grid graph with deterministic, uneven weights.
///
/// Node `(row, col)` has id `row * size + col`; horizontal and vertical
/// neighbours are joined by bidirectional edges roughly 100 m long.
#[allow(dead_code)]
pub fn grid_graph(size: i64) -> Graph {
    let spacing = 0.001;
    let mut nodes = Vec::new();
    for row in 0..size {
        for col in 0..size {
            nodes.push(Node {
                id: row * size + col,
                position: FixedCoordinate::new(
                    e9(48.85 + row as f64 * spacing),
                    e9(2.35 + col as f64 * spacing),
                ),
            });
        }
    }

    let mut edges = Vec::new();
    let mut next_id = 1;
    for row in 0..size {
        for col in 0..size {
            let id = row * size + col;
            let mut neighbours = Vec::new();
            if col + 1 < size {
                neighbours.push(id + 1);
            }
            if row + 1 < size {
                neighbours.push(id + size);
            }
            for to in neighbours {
                let weight = 100.0 + ((id * 7 + to * 13) % 11) as f64 * 9.5;
                edges.push(Edge {
                    id: next_id,
                    from: id,
                    to,
                    weight,
                    geometry: Vec::new(),
                    direction: EdgeDirection::Bidirectional,
                });
                next_id += 1;
            }
        }
    }

    Graph::from_parts(nodes, edges).expect("grid graph is valid")
}
