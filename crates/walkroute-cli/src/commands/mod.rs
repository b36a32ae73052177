// Module exports for CLI subcommands
//
// Each module handles one subcommand. main.rs parses arguments and
// dispatches to these handlers.

pub mod decode;
pub mod route;
pub mod snap;
pub mod snapshot;
