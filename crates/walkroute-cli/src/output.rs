//! Output formatting for command results.
//!
//! Every renderer returns the full text to print so the binary decides
//! where it goes and tests can inspect it directly.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::json;

use walkroute_lib::{Coordinate, Error, Route, Snap};

use crate::exit_codes;

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Pretty-printed JSON document.
    Json,
}

/// Summary of a written snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary<'a> {
    pub path: &'a Path,
    pub nodes: usize,
    pub edges: usize,
    pub bytes: u64,
}

pub fn render_route(route: &Route, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(route)?),
        OutputFormat::Text => {
            let mut out = String::new();
            writeln!(
                out,
                "Route from node {} to node {} ({} edges):",
                route.origin.node,
                route.destination.node,
                route.edges.len()
            )?;
            writeln!(out, "  Distance: {:.1} m", route.distance_m)?;
            writeln!(out, "  Origin: {}", describe_snap(&route.origin))?;
            writeln!(out, "  Destination: {}", describe_snap(&route.destination))?;
            writeln!(out, "  Nodes: {}", join_ids(&route.nodes))?;
            writeln!(out, "  Points: {}", route.points.len())?;
            write!(out, "  Polyline: {}", route.polyline)?;
            Ok(out)
        }
    }
}

pub fn render_snap(snap: &Snap, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(snap)?),
        OutputFormat::Text => Ok(format!("Snapped to {}", describe_snap(snap))),
    }
}

pub fn render_points(points: &[Coordinate], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(points)?),
        OutputFormat::Text => Ok(points
            .iter()
            .map(|point| format!("{},{}", point.lat, point.lon))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

pub fn render_snapshot(summary: &SnapshotSummary<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        OutputFormat::Text => Ok(format!(
            "Snapshot written to {} ({} nodes, {} edges, {} bytes)",
            summary.path.display(),
            summary.nodes,
            summary.edges,
            summary.bytes
        )),
    }
}

/// Render a command failure. JSON errors carry the error kind label.
pub fn render_error(err: &anyhow::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("error: {err:#}"),
        OutputFormat::Json => {
            let kind = exit_codes::library_error(err)
                .map(Error::kind)
                .map(exit_codes::label)
                .unwrap_or("internal");
            json!({ "error": { "kind": kind, "message": format!("{err:#}") } }).to_string()
        }
    }
}

fn describe_snap(snap: &Snap) -> String {
    format!(
        "node {} at {} ({:.1} m away)",
        snap.node, snap.position, snap.distance_m
    )
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkroute_lib::PathStep;

    fn sample_route() -> Route {
        let a = Coordinate::new(51.5, -0.14);
        let c = Coordinate::new(51.5, -0.138);
        Route {
            distance_m: 12.0,
            origin: Snap {
                node: 1,
                distance_m: 0.0,
                position: a,
            },
            destination: Snap {
                node: 3,
                distance_m: 1.25,
                position: c,
            },
            nodes: vec![1, 2, 3],
            edges: vec![
                PathStep {
                    edge: 10,
                    reversed: false,
                },
                PathStep {
                    edge: 11,
                    reversed: true,
                },
            ],
            points: vec![a, c],
            polyline: walkroute_lib::polyline::encode(&[a, c]),
        }
    }

    #[test]
    fn text_route_lists_nodes_and_polyline() {
        let route = sample_route();
        let text = render_route(&route, OutputFormat::Text).expect("render");
        assert!(text.starts_with("Route from node 1 to node 3 (2 edges):"));
        assert!(text.contains("Distance: 12.0 m"));
        assert!(text.contains("Nodes: 1 -> 2 -> 3"));
        assert!(text.contains("1.2 m away") || text.contains("1.3 m away"));
        assert!(text.ends_with(&route.polyline));
    }

    #[test]
    fn json_route_round_trips_through_serde() {
        let json = render_route(&sample_route(), OutputFormat::Json).expect("render");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["distance_m"], 12.0);
        assert_eq!(value["nodes"], json!([1, 2, 3]));
        assert_eq!(value["edges"][1]["reversed"], true);
        assert_eq!(value["origin"]["position"]["lat"], 51.5);
    }

    #[test]
    fn json_errors_carry_kind() {
        let err = anyhow::Error::new(Error::NoPathFound {
            origin: 1,
            destination: 4,
        });
        let rendered = render_error(&err, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("valid json");
        assert_eq!(value["error"]["kind"], "no_path");

        let text = render_error(&err, OutputFormat::Text);
        assert_eq!(text, "error: no path found between node 1 and node 4");
    }

    #[test]
    fn text_points_are_one_per_line() {
        let points = [Coordinate::new(38.5, -120.2), Coordinate::new(40.7, -120.95)];
        assert_eq!(
            render_points(&points, OutputFormat::Text).expect("render"),
            "38.5,-120.2\n40.7,-120.95"
        );
    }
}
