//! CLI subcommands.

mod trace_cmd;

pub use trace_cmd::*;
