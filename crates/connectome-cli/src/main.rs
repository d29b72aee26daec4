// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Command-Line Front End
// License: GNU LGPL v3 or later
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! `connectome -p <input> -o <prefix> -n … -t … -m …`
//!
//! Reads a samples × nodes text matrix, runs the parameter grid and writes
//! the global measures to `<prefix>.txt`. Any error is fatal: nothing is
//! written and the process exits with status 1.

mod cli;
mod io;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use log::LevelFilter;

use connectome_core::{GridRunner, SampleMatrix};
use connectome_types::ConnectomeResult;

use crate::cli::Args;

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_target(false).init();
}

fn run(args: &Args) -> ConnectomeResult<()> {
    let spec = args.grid_spec()?;
    let config = args.grid_config()?;

    let matrix = io::read_matrix(&args.input)?;
    log::info!(
        "{}: {} samples × {} nodes",
        args.input.display(),
        matrix.rows,
        matrix.cols
    );
    let samples = SampleMatrix::from_samples_by_nodes(&matrix.data, matrix.rows, matrix.cols)?;

    let runner = GridRunner::new(config)?;
    let output = runner.run(&samples, &spec)?;

    let path = args.output_path();
    io::write_table_file(&path, &output)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        Err(e) => e.exit(),
    };
    init_logging(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("\n{}", Args::command().render_usage());
            ExitCode::FAILURE
        }
    }
}
