use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::coord::Coordinate;
use crate::graph::{EdgeId, NodeId};

/// Convenient result alias for the walkroute library.
pub type Result<T> = std::result::Result<T, Error>;

/// Which end of a route request an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Origin,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Origin => f.write_str("origin"),
            Endpoint::Destination => f.write_str("destination"),
        }
    }
}

/// Coarse classification used by front ends to map failures to statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed caller input; nothing touched the graph.
    Input,
    /// Graph data missing or structurally invalid.
    GraphLoad,
    /// A coordinate had no node within the snap radius.
    Snap,
    /// Both endpoints snapped but no path connects them.
    NoPath,
    /// Writing a result to disk failed.
    Output,
}

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Coordinate text or values could not be accepted.
    #[error("invalid coordinate '{input}': {reason}")]
    InvalidCoordinate { input: String, reason: String },

    /// Encoded polyline could not be decoded.
    #[error("malformed polyline at byte {position}")]
    MalformedPolyline { position: usize },

    /// Graph source could not be located at the resolved path.
    #[error("graph data not found at {path}")]
    GraphNotFound { path: PathBuf },

    /// Raised when the database does not contain a supported table layout.
    #[error("unsupported graph schema; expected nodes/edges tables")]
    UnsupportedSchema,

    /// Two node records share an identifier.
    #[error("duplicate node id {id}")]
    DuplicateNode { id: NodeId },

    /// Node position lies outside ±90° latitude or ±180° longitude.
    #[error("node {id} has out-of-range position ({lat_e9}, {lon_e9})")]
    NodeOutOfRange { id: NodeId, lat_e9: i64, lon_e9: i64 },

    /// Two edge records share an identifier.
    #[error("duplicate edge id {id}")]
    DuplicateEdge { id: EdgeId },

    /// Edge references a node that is not part of the graph.
    #[error("edge {edge} references unknown node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },

    /// Edge weight is negative or not a finite number.
    #[error("edge {edge} has invalid weight {weight}")]
    InvalidWeight { edge: EdgeId, weight: f64 },

    /// Edge geometry cannot describe a path between its endpoints.
    #[error("edge {edge} has invalid geometry: {message}")]
    InvalidGeometry { edge: EdgeId, message: String },

    /// A path step names an edge the graph does not hold.
    #[error("route references unknown edge {edge}")]
    UnknownEdge { edge: EdgeId },

    /// Raised when serializing a graph snapshot fails.
    #[error("failed to serialize graph snapshot: {message}")]
    SnapshotSerialize { message: String },

    /// Raised when a snapshot file cannot be written.
    #[error("failed to write graph snapshot to {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Raised when loading a graph snapshot from a file fails.
    #[error("failed to load graph snapshot from {path}: {message}")]
    SnapshotLoad { path: PathBuf, message: String },

    /// No graph node lies within the snap radius of the coordinate.
    #[error("{endpoint} {coordinate} is not within {max_radius_m}m of the path network")]
    SnapFailed {
        endpoint: Endpoint,
        coordinate: Coordinate,
        max_radius_m: f64,
    },

    /// Raised when no route connects the snapped endpoints.
    #[error("no path found between node {origin} and node {destination}")]
    NoPathFound { origin: NodeId, destination: NodeId },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON geometry decoding errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Classify the error for status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidCoordinate { .. } | Error::MalformedPolyline { .. } => ErrorKind::Input,
            Error::SnapFailed { .. } => ErrorKind::Snap,
            Error::NoPathFound { .. } => ErrorKind::NoPath,
            Error::GraphNotFound { .. }
            | Error::UnsupportedSchema
            | Error::DuplicateNode { .. }
            | Error::NodeOutOfRange { .. }
            | Error::DuplicateEdge { .. }
            | Error::DanglingEdge { .. }
            | Error::InvalidWeight { .. }
            | Error::InvalidGeometry { .. }
            | Error::UnknownEdge { .. }
            | Error::SnapshotSerialize { .. }
            | Error::SnapshotLoad { .. }
            | Error::Sqlite(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorKind::GraphLoad,
            Error::SnapshotWrite { .. } => ErrorKind::Output,
        }
    }
}
