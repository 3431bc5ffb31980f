//! CLI binary for the Things bridge.
//!
//! This binary is a thin wrapper that parses arguments and delegates to the
//! library.

use clap::Parser;
use std::process::ExitCode;
use things_bridge::cli::{run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = run(cli);

    for line in output.stdout {
        println!("{line}");
    }
    for line in output.stderr {
        eprintln!("{line}");
    }

    output.exit_code
}
