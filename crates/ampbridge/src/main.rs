mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ampbridge", version, about = "Broker CLI for networked audio streamers")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format).await;

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
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "ampbridge",
            "send",
            "192.168.1.10:8899",
            "MCU+PAS+RAKOIT:VOL&",
            "--wait",
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn rejects_reply_key_without_wait() {
        let err = Cli::try_parse_from([
            "ampbridge",
            "send",
            "ws://192.168.1.10/ws",
            "--flavor",
            "ws",
            "#CMD:STATUS",
            "--reply-key",
            "STATUS",
        ])
        .expect_err("--reply-key without --wait should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_volume_set() {
        let cli = Cli::try_parse_from([
            "ampbridge",
            "volume",
            "192.168.1.10:8899",
            "--set",
            "0.35",
            "--timeout",
            "2s",
        ])
        .expect("volume args should parse");

        match cli.command {
            Command::Volume(args) => assert_eq!(args.set, Some(0.35)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_watch_with_ws_flavor() {
        let cli = Cli::try_parse_from([
            "ampbridge",
            "watch",
            "ws://192.168.1.10/ws",
            "--flavor",
            "ws",
            "--count",
            "3",
        ])
        .expect("watch args should parse");

        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.connect.flavor, crate::cmd::FlavorArg::Ws);
                assert_eq!(args.count, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_flavor() {
        let err = Cli::try_parse_from([
            "ampbridge",
            "info",
            "192.168.1.10:8899",
            "--flavor",
            "serial",
        ])
        .expect_err("unknown flavor should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
