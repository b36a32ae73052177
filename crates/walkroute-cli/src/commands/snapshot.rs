//! Snapshot command handler: compile the graph into a binary snapshot.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use walkroute_lib::{save_snapshot, snapshot_path, GraphStore};

use walkroute_cli::output::{render_snapshot, OutputFormat, SnapshotSummary};

pub fn handle_snapshot(graph_path: &Path, output: Option<&Path>, format: OutputFormat) -> Result<()> {
    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| snapshot_path(graph_path));

    let store = GraphStore::open(graph_path);
    let loaded = store.load()?;
    save_snapshot(loaded.graph(), &target)?;

    let bytes = fs::metadata(&target)
        .with_context(|| format!("failed to stat snapshot {}", target.display()))?
        .len();
    let summary = SnapshotSummary {
        path: &target,
        nodes: loaded.graph().node_count(),
        edges: loaded.graph().edge_count(),
        bytes,
    };

    println!("{}", render_snapshot(&summary, format)?);
    Ok(())
}
