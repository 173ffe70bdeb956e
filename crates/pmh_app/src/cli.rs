use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pmh_logging::{LevelFilter, LogDestination};

/// Harvesting data provider front end.
///
/// Answers OAI-PMH style query strings against the configured search index
/// and prints each response as JSON.
#[derive(Parser, Debug, Clone)]
#[command(name = "pmh_app")]
#[command(about = "Answer harvesting requests against a search index")]
pub struct Args {
    /// Provider configuration (RON)
    #[arg(long, short = 'c', default_value = "provider.ron")]
    pub config: PathBuf,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Log file used by `--log file` and `--log both`
    #[arg(long, default_value = "pmh.log")]
    pub log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,

    /// Query strings such as `verb=ListRecords&metadataPrefix=oai_dc`.
    /// Without any, one query string is read per line from stdin.
    pub requests: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_requests_and_log_options() {
        let args = Args::try_parse_from([
            "pmh_app",
            "--config",
            "my.ron",
            "--log",
            "both",
            "--log-level",
            "debug",
            "verb=Identify",
            "verb=ListSets",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("my.ron"));
        assert_eq!(LogDestination::from(args.log), LogDestination::Both);
        assert_eq!(args.log_level, LevelFilter::Debug);
        assert_eq!(args.requests, ["verb=Identify", "verb=ListSets"]);
    }

    #[test]
    fn defaults_to_terminal_logging_and_stdin() {
        let args = Args::try_parse_from(["pmh_app"]).unwrap();
        assert_eq!(args.log, LogTarget::Terminal);
        assert!(args.requests.is_empty());
    }
}
