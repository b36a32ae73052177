//! Graph location and planner option resolution.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use walkroute_lib::{PlannerOptions, SearchBudget, SnapOptions};

/// Environment variable consulted when `--graph` is not given.
pub const GRAPH_PATH_ENV: &str = "WALKROUTE_GRAPH_PATH";

/// File name used when no path is configured, or when a directory is given.
pub const DEFAULT_GRAPH_FILENAME: &str = "walkroute.db";

/// Resolve the graph file: explicit flag, then `WALKROUTE_GRAPH_PATH`, then
/// `walkroute.db` in the working directory.
pub fn resolve_graph_path(explicit: Option<&Path>) -> PathBuf {
    resolve_graph_path_from(explicit, env::var_os(GRAPH_PATH_ENV))
}

fn resolve_graph_path_from(explicit: Option<&Path>, env_value: Option<OsString>) -> PathBuf {
    if let Some(path) = explicit {
        return canonical_graph_path(path);
    }

    if let Some(value) = env_value.filter(|value| !value.is_empty()) {
        return canonical_graph_path(Path::new(&value));
    }

    PathBuf::from(DEFAULT_GRAPH_FILENAME)
}

fn canonical_graph_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DEFAULT_GRAPH_FILENAME)
    } else {
        path.to_path_buf()
    }
}

/// Build planner options from command-line values.
pub fn planner_options(
    max_snap_radius_m: f64,
    max_settled: usize,
    timeout_ms: Option<u64>,
) -> PlannerOptions {
    PlannerOptions {
        snap: SnapOptions {
            max_radius_m: max_snap_radius_m,
        },
        budget: SearchBudget {
            max_settled: (max_settled > 0).then_some(max_settled),
            time_limit: timeout_ms.map(Duration::from_millis),
        },
    }
}

/// Clap value parser for distances: finite and not negative.
pub fn parse_radius(value: &str) -> Result<f64, String> {
    let radius: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(format!("'{value}' must be a non-negative distance in meters"));
    }
    Ok(radius)
}
