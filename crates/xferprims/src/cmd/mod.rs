use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod check;
pub mod transfer;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Move a buffer to a worker thread context and report what arrived.
    Transfer(TransferArgs),
    /// Verify transfer invariants against the reference host.
    Check(CheckArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Transfer(args) => transfer::run(args, format),
        Command::Check(args) => check::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Buffer length in bytes.
    #[arg(long, default_value = "16")]
    pub size: usize,
    /// Transfer a SharedArrayBuffer instead of an ArrayBuffer.
    #[arg(long)]
    pub shared: bool,
    /// Make the buffer resizable (or growable with --shared) up to this length.
    #[arg(long, value_name = "BYTES")]
    pub max_byte_length: Option<usize>,
    /// Upper bound on any single allocation.
    #[arg(long, value_name = "BYTES", env = "XFERPRIMS_MAX_BYTE_LENGTH")]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct CheckArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
