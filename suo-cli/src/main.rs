//! Process glue for the `suo` framing pipeline: parses the one positional
//! configuration-file argument, assembles a pipeline, and runs the
//! signal-I/O main loop until it stops on its own or the process receives
//! a shutdown signal.
//!
//! Everything this binary does beyond that belongs to external
//! collaborators out of this crate's scope: a real SDR device driver and
//! a real out-of-band frame bus. The pipeline assembled here uses
//! `suo_core::io::test_io`'s in-process stand-ins for both, so the binary
//! is runnable end-to-end without hardware.

mod logging;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};

use suo_core::framing::golay_framer::{GolayDeframer, GolayFramer};
use suo_core::framing::hdlc::{HdlcDeframer, HdlcFramer};
use suo_core::pipeline::Assembler;

/// Which bit-oriented framing state machine to assemble the pipeline with
/// (HDLC vs Golay). Fixed for the life of the process; the config file
/// only ever tunes parameters of whichever one is selected.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Framing {
    Hdlc,
    Golay,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs the suo SDR framing pipeline", long_about = None)]
struct Cli {
    /// Path to a configuration file. With no argument, every stage runs
    /// at its default configuration.
    config: Option<PathBuf>,

    /// Framing state machine to assemble (the config file only tunes its
    /// parameters; this flag picks HDLC vs Golay).
    #[arg(long, value_enum, default_value_t = Framing::Hdlc)]
    framing: Framing,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_text = match &cli.config {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read configuration file {}", path.display()))?,
        None => {
            tracing::info!("no configuration file given; running every stage at its default configuration");
            String::new()
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        tracing::info!("shutdown requested; stopping after the current tick");
        stop_for_handler.store(true, Ordering::Relaxed);
    })
    .wrap_err("failed to install the Ctrl-C handler")?;

    let mut pipeline = match cli.framing {
        Framing::Hdlc => Assembler::<HdlcFramer, HdlcDeframer>::assemble(&config_text),
        Framing::Golay => Assembler::<GolayFramer, GolayDeframer>::assemble(&config_text),
    }
    .wrap_err("failed to assemble the pipeline from configuration")?;

    tracing::info!(framing = ?cli.framing, "pipeline assembled; entering signal I/O loop");
    pipeline.run_until(&stop).wrap_err("signal I/O loop terminated with an error")?;
    tracing::info!("signal I/O loop stopped");

    Ok(())
}
