//! Compiled binary graph snapshots for fast cold starts.
//!
//! Parsing a large SQLite graph (and its JSON geometry) dominates start-up
//! time. A snapshot stores the already-parsed node and edge records in a
//! compact, checksummed file that loads without SQL or JSON work.
//!
//! # Serialization Format
//!
//! ```text
//! Header (16 bytes):
//!   - Magic: b"WRGS" (4 bytes)
//!   - Version: u8 (1 byte)
//!   - Flags: u8 (1 byte) - bit 0: contains directed edges
//!   - Node count: u32 (4 bytes)
//!   - Edge count: u32 (4 bytes)
//!   - Reserved: 2 bytes
//!
//! Body:
//!   - postcard-serialized nodes and edges (sorted by id)
//!   - zstd compressed
//!
//! Footer (32 bytes):
//!   - SHA-256 checksum of compressed body
//! ```
//!
//! Loaded records are re-validated through [`Graph::from_parts`], so a
//! snapshot can never smuggle in a graph the database loader would reject.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph::{Edge, EdgeDirection, Graph, Node};
use crate::store::GraphSource;

/// Magic bytes identifying a graph snapshot file.
const SNAPSHOT_MAGIC: &[u8; 4] = b"WRGS";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u8 = 1;

/// Flag: snapshot includes directed edges.
const FLAG_HAS_DIRECTED: u8 = 0x01;

/// Header size in bytes.
const HEADER_SIZE: usize = 16;

/// Checksum size in bytes (SHA-256).
const CHECKSUM_SIZE: usize = 32;

/// zstd compression level (balanced speed/ratio).
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Serialize)]
struct SnapshotBodyRef<'a> {
    nodes: Vec<&'a Node>,
    edges: Vec<&'a Edge>,
}

#[derive(Deserialize)]
struct SnapshotBody {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Graph source backed by a snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphSource for SnapshotSource {
    fn describe(&self) -> String {
        format!("snapshot:{}", self.path.display())
    }

    fn read_graph(&self) -> Result<Graph> {
        load_snapshot(&self.path)
    }
}

/// Serialize a graph to a snapshot file.
pub fn save_snapshot(graph: &Graph, path: &Path) -> Result<()> {
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "saving graph snapshot"
    );

    let mut nodes: Vec<&Node> = graph.nodes().collect();
    nodes.sort_by_key(|node| node.id);
    let mut edges: Vec<&Edge> = graph.edges().collect();
    edges.sort_by_key(|edge| edge.id);

    let node_count = count_to_u32(nodes.len(), "node")?;
    let edge_count = count_to_u32(edges.len(), "edge")?;
    let has_directed = edges
        .iter()
        .any(|edge| edge.direction == EdgeDirection::Directed);

    let serialized = postcard::to_allocvec(&SnapshotBodyRef { nodes, edges }).map_err(|e| {
        Error::SnapshotSerialize {
            message: format!("postcard serialization failed: {}", e),
        }
    })?;

    let compressed =
        zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL).map_err(|e| {
            Error::SnapshotSerialize {
                message: format!("zstd compression failed: {}", e),
            }
        })?;

    let checksum = Sha256::digest(&compressed);

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(SNAPSHOT_MAGIC);
    header[4] = SNAPSHOT_VERSION;
    header[5] = if has_directed { FLAG_HAS_DIRECTED } else { 0 };
    header[6..10].copy_from_slice(&node_count.to_le_bytes());
    header[10..14].copy_from_slice(&edge_count.to_le_bytes());
    // bytes 14-15 reserved

    let write_error = |source| Error::SnapshotWrite {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header).map_err(write_error)?;
    writer.write_all(&compressed).map_err(write_error)?;
    writer.write_all(&checksum).map_err(write_error)?;
    writer.flush().map_err(write_error)?;

    info!(
        file_size = HEADER_SIZE + compressed.len() + CHECKSUM_SIZE,
        compressed_size = compressed.len(),
        "graph snapshot saved"
    );

    Ok(())
}

/// Load and validate a graph from a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Graph> {
    debug!(path = %path.display(), "loading graph snapshot");

    if !path.exists() {
        return Err(Error::GraphNotFound {
            path: path.to_path_buf(),
        });
    }

    let load_error = |message: String| Error::SnapshotLoad {
        path: path.to_path_buf(),
        message,
    };

    let bytes = fs::read(path)?;
    if bytes.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(load_error(format!(
            "file is {} bytes, smaller than header and checksum",
            bytes.len()
        )));
    }

    let (header, rest) = bytes.split_at(HEADER_SIZE);
    let (compressed, stored_checksum) = rest.split_at(rest.len() - CHECKSUM_SIZE);

    if &header[0..4] != SNAPSHOT_MAGIC {
        return Err(load_error("invalid magic bytes".to_string()));
    }

    let version = header[4];
    if version != SNAPSHOT_VERSION {
        return Err(load_error(format!(
            "unsupported version {} (expected {})",
            version, SNAPSHOT_VERSION
        )));
    }

    let node_count = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);
    let edge_count = u32::from_le_bytes([header[10], header[11], header[12], header[13]]);

    let computed_checksum = Sha256::digest(compressed);
    if computed_checksum.as_slice() != stored_checksum {
        return Err(load_error(
            "checksum mismatch - file may be corrupted".to_string(),
        ));
    }

    let decompressed = zstd::decode_all(compressed)
        .map_err(|e| load_error(format!("zstd decompression failed: {}", e)))?;

    let body: SnapshotBody = postcard::from_bytes(&decompressed)
        .map_err(|e| load_error(format!("postcard deserialization failed: {}", e)))?;

    if body.nodes.len() != node_count as usize || body.edges.len() != edge_count as usize {
        warn!(
            expected_nodes = node_count,
            actual_nodes = body.nodes.len(),
            expected_edges = edge_count,
            actual_edges = body.edges.len(),
            "record count mismatch in graph snapshot"
        );
    }

    let graph = Graph::from_parts(body.nodes, body.edges)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph loaded from snapshot"
    );
    Ok(graph)
}

/// Derive the snapshot path from a database path.
///
/// The snapshot is stored alongside the database with a `.graph.bin`
/// extension. For example, `walkroute.db` -> `walkroute.db.graph.bin`.
pub fn snapshot_path(db_path: &Path) -> PathBuf {
    let mut path = db_path.as_os_str().to_owned();
    path.push(".graph.bin");
    PathBuf::from(path)
}

/// Returns true when the file at `path` starts with the snapshot magic.
pub fn is_snapshot(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut magic))
        .map(|()| &magic == SNAPSHOT_MAGIC)
        .unwrap_or(false)
}

fn count_to_u32(count: usize, what: &str) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::SnapshotSerialize {
        message: format!("{what} count {count} exceeds snapshot limit"),
    })
}
