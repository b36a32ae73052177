//! Walkroute CLI library.
//!
//! Shared pieces of the `walkroute` binary: graph path resolution, exit
//! status mapping, and output rendering.

pub mod config;
pub mod exit_codes;
pub mod output;
