//! Route geometry reconstruction from the edges chosen by the search.

use crate::coord::{Coordinate, FixedCoordinate};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::path::PathStep;

/// Concatenate the geometry of each step into one continuous point list.
///
/// Steps walked against their stored direction contribute their points in
/// reverse. The first point of every step after the first is dropped, since
/// it is the junction already emitted by the previous step, so the result
/// holds `sum(points) - (steps - 1)` points.
pub fn assemble(graph: &Graph, steps: &[PathStep]) -> Result<Vec<FixedCoordinate>> {
    let mut points = Vec::new();

    for (position, step) in steps.iter().enumerate() {
        let edge = graph
            .edge(step.edge)
            .ok_or(Error::UnknownEdge { edge: step.edge })?;

        let skip = usize::from(position > 0);
        if step.reversed {
            points.extend(edge.geometry.iter().rev().skip(skip).copied());
        } else {
            points.extend(edge.geometry.iter().skip(skip).copied());
        }
    }

    Ok(points)
}

/// Convert fixed-point geometry to degrees.
pub fn to_degrees(points: &[FixedCoordinate]) -> Vec<Coordinate> {
    points.iter().map(|point| point.to_degrees()).collect()
}
