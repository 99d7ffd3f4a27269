mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "xferprims", version, about = "Zero-copy buffer transfer CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        env = "XFERPRIMS_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "XFERPRIMS_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transfer_subcommand() {
        let cli = Cli::try_parse_from([
            "xferprims",
            "transfer",
            "--size",
            "64",
            "--shared",
            "--max-byte-length",
            "128",
        ])
        .expect("transfer args should parse");

        match cli.command {
            Command::Transfer(args) => {
                assert_eq!(args.size, 64);
                assert!(args.shared);
                assert_eq!(args.max_byte_length, Some(128));
            }
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn transfer_size_defaults_to_sixteen() {
        let cli = Cli::try_parse_from(["xferprims", "transfer"]).expect("defaults should parse");
        assert!(matches!(cli.command, Command::Transfer(ref args) if args.size == 16));
    }

    #[test]
    fn rejects_unknown_format() {
        let err = Cli::try_parse_from(["xferprims", "--format", "raw", "check"])
            .expect_err("raw is not an output format");

        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
