use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use walkroute_cli::config::{parse_radius, planner_options, resolve_graph_path};
use walkroute_cli::exit_codes;
use walkroute_cli::output::{render_error, OutputFormat};
use walkroute_lib::{DEFAULT_MAX_SETTLED, DEFAULT_MAX_SNAP_RADIUS_M};

mod commands;

use commands::route::RouteCommandArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "Walking route planner over a path graph")]
struct Cli {
    /// Graph database or snapshot file. Falls back to WALKROUTE_GRAPH_PATH,
    /// then walkroute.db.
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Maximum distance in meters between a coordinate and its snapped node.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_SNAP_RADIUS_M, value_parser = parse_radius)]
    max_snap_radius: f64,

    /// Maximum nodes the search may settle (0 for no limit).
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_SETTLED)]
    max_settled: usize,

    /// Wall-clock limit for a single search, in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the shortest walking route between two coordinates.
    Route {
        /// Origin as "lat,lng".
        #[arg(long = "from", allow_hyphen_values = true)]
        from: String,
        /// Destination as "lat,lng".
        #[arg(long = "to", allow_hyphen_values = true)]
        to: String,
    },
    /// Snap a coordinate to its nearest graph node.
    Snap {
        /// Coordinate as "lat,lng".
        #[arg(long = "at", allow_hyphen_values = true)]
        at: String,
    },
    /// Compile the graph into a binary snapshot for faster loading.
    Snapshot {
        /// Output file (defaults to "<graph>.graph.bin").
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Decode an encoded polyline into points.
    Decode {
        /// Encoded polyline string.
        #[arg(allow_hyphen_values = true)]
        polyline: String,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let graph_path = resolve_graph_path(cli.graph.as_deref());
    let options = planner_options(cli.max_snap_radius, cli.max_settled, cli.timeout_ms);
    let format = cli.format;

    let result = match cli.command {
        Command::Route { from, to } => commands::route::handle_route(
            &graph_path,
            options,
            &RouteCommandArgs { from, to },
            format,
        ),
        Command::Snap { at } => commands::snap::handle_snap(&graph_path, options, &at, format),
        Command::Snapshot { output } => {
            commands::snapshot::handle_snapshot(&graph_path, output.as_deref(), format)
        }
        Command::Decode { polyline } => commands::decode::handle_decode(&polyline, format),
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(err) => {
            let rendered = render_error(&err, format);
            match format {
                OutputFormat::Json => println!("{rendered}"),
                OutputFormat::Text => eprintln!("{rendered}"),
            }
            ExitCode::from(exit_codes::for_error(&err))
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
