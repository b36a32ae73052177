//! Route command handler for walking routes between two coordinates.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use walkroute_lib::{Coordinate, GraphStore, PlannerOptions, RoutePlanner};

use walkroute_cli::output::{render_route, OutputFormat};

/// Arguments for the route command.
#[derive(Debug, Clone)]
pub struct RouteCommandArgs {
    /// Origin as `lat,lng` text.
    pub from: String,
    /// Destination as `lat,lng` text.
    pub to: String,
}

pub fn handle_route(
    graph_path: &Path,
    options: PlannerOptions,
    args: &RouteCommandArgs,
    format: OutputFormat,
) -> Result<()> {
    // Parse both endpoints before touching the graph.
    let origin: Coordinate = args.from.parse()?;
    let destination: Coordinate = args.to.parse()?;

    let store = Arc::new(GraphStore::open(graph_path));
    debug!(source = %store.describe(), %origin, %destination, "planning route");

    let planner = RoutePlanner::new(store, options);
    let route = planner.route(origin, destination)?;

    println!("{}", render_route(&route, format)?);
    Ok(())
}
