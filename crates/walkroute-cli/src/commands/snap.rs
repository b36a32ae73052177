//! Snap command handler: resolve one coordinate to its nearest node.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use walkroute_lib::{Coordinate, Endpoint, GraphStore, PlannerOptions, RoutePlanner};

use walkroute_cli::output::{render_snap, OutputFormat};

pub fn handle_snap(
    graph_path: &Path,
    options: PlannerOptions,
    at: &str,
    format: OutputFormat,
) -> Result<()> {
    let coordinate: Coordinate = at.parse()?;

    let planner = RoutePlanner::new(Arc::new(GraphStore::open(graph_path)), options);
    let snap = planner.snap(coordinate, Endpoint::Origin)?;

    println!("{}", render_snap(&snap, format)?);
    Ok(())
}
