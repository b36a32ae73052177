use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, Row};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::coord::FixedCoordinate;
use crate::error::{Error, Result};
use crate::graph::{Edge, EdgeDirection, EdgeId, Graph, Node};
use crate::store::GraphSource;

const NODES_TABLE: &str = "nodes";
const EDGES_TABLE: &str = "edges";
const EDGE_POINTS_TABLE: &str = "edge_points";

const NODE_COLUMNS: [&str; 3] = ["id", "lat_e9", "lon_e9"];
const EDGE_COLUMNS: [&str; 4] = ["id", "from_node", "to_node", "weight"];
const EDGE_POINT_COLUMNS: [&str; 4] = ["edge_id", "seq", "lat_e9", "lon_e9"];
const GEOMETRY_COLUMN: &str = "geometry";
const DIRECTION_COLUMN: &str = "bidirectional";

/// Where edge shape points are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeometryLayout {
    /// JSON array in `edges.geometry`.
    Inline,
    /// One row per point in `edge_points`, ordered by `seq`.
    PointTable,
    /// No stored shape; edges are straight between their endpoints.
    EndpointsOnly,
}

impl fmt::Display for GeometryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            GeometryLayout::Inline => "inline",
            GeometryLayout::PointTable => "point_table",
            GeometryLayout::EndpointsOnly => "endpoints_only",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SchemaDefinition {
    geometry: GeometryLayout,
    /// Missing column means every edge is walkable both ways.
    has_direction: bool,
}

/// Geometry point as stored in the JSON column. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct GeometryRecord {
    lat: i64,
    lon: i64,
}

/// Graph source backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphSource for SqliteSource {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    fn read_graph(&self) -> Result<Graph> {
        load_graph(&self.path)
    }
}

/// Load nodes and edges from a SQLite database into a validated graph.
///
/// The loader detects at runtime whether edge shapes are stored inline as
/// JSON, in a separate `edge_points` table, or not at all, and whether the
/// `edges` table carries a `bidirectional` flag. All records pass through
/// [`Graph::from_parts`], so dangling endpoints and invalid weights are
/// rejected rather than silently dropped.
pub fn load_graph(db_path: &Path) -> Result<Graph> {
    if !db_path.exists() {
        return Err(Error::GraphNotFound {
            path: db_path.to_path_buf(),
        });
    }

    let connection = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let schema = detect_schema(&connection)?;
    debug!(
        geometry = %schema.geometry,
        directional = schema.has_direction,
        path = %db_path.display(),
        "loading graph"
    );

    let nodes = load_nodes(&connection)?;
    let mut edges = load_edges(&connection, &schema)?;
    if schema.geometry == GeometryLayout::PointTable {
        attach_point_table(&connection, &mut edges)?;
    }

    let graph = Graph::from_parts(nodes, edges)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph loaded from database"
    );
    Ok(graph)
}

fn detect_schema(connection: &Connection) -> Result<SchemaDefinition> {
    if !table_exists(connection, NODES_TABLE)?
        || !table_exists(connection, EDGES_TABLE)?
        || !table_has_columns(connection, NODES_TABLE, &NODE_COLUMNS)?
        || !table_has_columns(connection, EDGES_TABLE, &EDGE_COLUMNS)?
    {
        return Err(Error::UnsupportedSchema);
    }

    let geometry = if table_has_columns(connection, EDGES_TABLE, &[GEOMETRY_COLUMN])? {
        GeometryLayout::Inline
    } else if table_exists(connection, EDGE_POINTS_TABLE)?
        && table_has_columns(connection, EDGE_POINTS_TABLE, &EDGE_POINT_COLUMNS)?
    {
        GeometryLayout::PointTable
    } else {
        GeometryLayout::EndpointsOnly
    };

    Ok(SchemaDefinition {
        geometry,
        has_direction: table_has_columns(connection, EDGES_TABLE, &[DIRECTION_COLUMN])?,
    })
}

fn load_nodes(connection: &Connection) -> Result<Vec<Node>> {
    let sql = format!(
        "SELECT {id}, {lat}, {lon} FROM {table}",
        id = NODE_COLUMNS[0],
        lat = NODE_COLUMNS[1],
        lon = NODE_COLUMNS[2],
        table = NODES_TABLE
    );

    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(Node {
            id: row.get(0)?,
            position: FixedCoordinate::new(row.get(1)?, row.get(2)?),
        })
    })?;

    let mut nodes = Vec::new();
    for entry in rows {
        nodes.push(entry?);
    }
    Ok(nodes)
}

fn load_edges(connection: &Connection, schema: &SchemaDefinition) -> Result<Vec<Edge>> {
    let mut selects: Vec<String> = EDGE_COLUMNS.iter().map(|c| c.to_string()).collect();
    if schema.geometry == GeometryLayout::Inline {
        selects.push(GEOMETRY_COLUMN.to_string());
    } else {
        selects.push(format!("NULL AS {GEOMETRY_COLUMN}"));
    }
    if schema.has_direction {
        selects.push(DIRECTION_COLUMN.to_string());
    } else {
        selects.push(format!("1 AS {DIRECTION_COLUMN}"));
    }

    let sql = format!(
        "SELECT {selects} FROM {table}",
        selects = selects.join(", "),
        table = EDGES_TABLE
    );

    let mut stmt = connection.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut edges = Vec::new();
    while let Some(row) = rows.next()? {
        edges.push(row_to_edge(row)?);
    }
    Ok(edges)
}

fn row_to_edge(row: &Row<'_>) -> Result<Edge> {
    let id: EdgeId = row.get(0)?;
    let geometry_json: Option<String> = row.get(4)?;
    let bidirectional: Option<bool> = row.get(5)?;

    let geometry = match geometry_json.as_deref().map(str::trim) {
        None | Some("") => Vec::new(),
        Some(json) => parse_geometry(id, json)?,
    };

    Ok(Edge {
        id,
        from: row.get(1)?,
        to: row.get(2)?,
        weight: row.get(3)?,
        geometry,
        direction: if bidirectional.unwrap_or(true) {
            EdgeDirection::Bidirectional
        } else {
            EdgeDirection::Directed
        },
    })
}

fn parse_geometry(edge: EdgeId, json: &str) -> Result<Vec<FixedCoordinate>> {
    let records: Vec<GeometryRecord> =
        serde_json::from_str(json).map_err(|e| Error::InvalidGeometry {
            edge,
            message: e.to_string(),
        })?;
    Ok(records
        .into_iter()
        .map(|record| FixedCoordinate::new(record.lat, record.lon))
        .collect())
}

fn attach_point_table(connection: &Connection, edges: &mut [Edge]) -> Result<()> {
    let sql = format!(
        "SELECT {edge}, {lat}, {lon} FROM {table} ORDER BY {edge}, {seq}",
        edge = EDGE_POINT_COLUMNS[0],
        seq = EDGE_POINT_COLUMNS[1],
        lat = EDGE_POINT_COLUMNS[2],
        lon = EDGE_POINT_COLUMNS[3],
        table = EDGE_POINTS_TABLE
    );

    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, EdgeId>(0)?,
            FixedCoordinate::new(row.get(1)?, row.get(2)?),
        ))
    })?;

    let mut points: HashMap<EdgeId, Vec<FixedCoordinate>> = HashMap::new();
    for row in rows {
        let (edge, point) = row?;
        points.entry(edge).or_default().push(point);
    }

    for edge in edges.iter_mut() {
        if let Some(geometry) = points.remove(&edge.id) {
            edge.geometry = geometry;
        }
    }

    if !points.is_empty() {
        warn!(
            orphaned_edges = points.len(),
            "ignored edge points referencing unknown edges",
        );
    }

    Ok(())
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let mut stmt = connection
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

fn table_has_columns(connection: &Connection, table: &str, required: &[&str]) -> Result<bool> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = connection.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }

    Ok(required.iter().all(|required| {
        columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(required))
    }))
}
