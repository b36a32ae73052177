//! Process exit statuses.

use walkroute_lib::{Error, ErrorKind};

pub const SUCCESS: u8 = 0;
/// Failure outside the routing pipeline, such as writing a snapshot.
pub const FAILURE: u8 = 1;
/// Malformed input; clap usage errors also exit with 2.
pub const INPUT: u8 = 2;
pub const GRAPH_LOAD: u8 = 3;
pub const SNAP: u8 = 4;
pub const NO_PATH: u8 = 5;

/// Map a library error kind to its exit status.
pub fn for_kind(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Input => INPUT,
        ErrorKind::GraphLoad => GRAPH_LOAD,
        ErrorKind::Snap => SNAP,
        ErrorKind::NoPath => NO_PATH,
        ErrorKind::Output => FAILURE,
    }
}

/// Short machine-readable label for a kind, used in JSON error output.
pub fn label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Input => "input",
        ErrorKind::GraphLoad => "graph_load",
        ErrorKind::Snap => "snap",
        ErrorKind::NoPath => "no_path",
        ErrorKind::Output => "output",
    }
}

/// Find the library error anywhere in an `anyhow` chain.
pub fn library_error(err: &anyhow::Error) -> Option<&Error> {
    err.chain().find_map(|cause| cause.downcast_ref::<Error>())
}

/// Exit status for an error returned by a command handler.
pub fn for_error(err: &anyhow::Error) -> u8 {
    library_error(err)
        .map(|err| for_kind(err.kind()))
        .unwrap_or(FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use walkroute_lib::Endpoint;

    #[test]
    fn wrapped_library_errors_keep_their_status() {
        let err = Err::<(), _>(Error::NoPathFound {
            origin: 1,
            destination: 2,
        })
        .context("route failed")
        .expect_err("error");
        assert_eq!(for_error(&err), NO_PATH);

        let err = anyhow::Error::new(Error::SnapFailed {
            endpoint: Endpoint::Origin,
            coordinate: walkroute_lib::Coordinate::new(0.0, 0.0),
            max_radius_m: 500.0,
        });
        assert_eq!(for_error(&err), SNAP);
    }

    #[test]
    fn other_errors_are_generic_failures() {
        let err = anyhow::anyhow!("disk full");
        assert_eq!(for_error(&err), FAILURE);
    }

    #[test]
    fn snapshot_write_failure_is_not_a_graph_load_error() {
        let err = anyhow::Error::new(Error::SnapshotWrite {
            path: "/readonly/graph.bin".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(for_error(&err), FAILURE);
        assert_eq!(label(Error::kind(library_error(&err).expect("library error"))), "output");
    }
}
