//! Decode command handler: expand a polyline into points.

use anyhow::Result;

use walkroute_lib::polyline;

use walkroute_cli::output::{render_points, OutputFormat};

pub fn handle_decode(encoded: &str, format: OutputFormat) -> Result<()> {
    let points = polyline::decode(encoded.trim())?;
    println!("{}", render_points(&points, format)?);
    Ok(())
}
