//! Gridsnap - command-line tool for building on-chain collage snapshots

use std::process::ExitCode;

use gridsnap::cli;

fn main() -> ExitCode {
    cli::run()
}
