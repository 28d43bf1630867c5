//! Command-line interface of the `pcdomain` binary.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "pipeline.toml";

/// Options given on the command line. Every one of them except the config
/// path overrides a value of the pipeline file.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub log_level: Option<String>,
    pub json_logs: bool,
}

fn command() -> Command {
    Command::new("pcdomain")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Domain-filtered classification and grid decimation of LAS point clouds")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Pipeline configuration file")
                .default_value(DEFAULT_CONFIG),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Input LAS file, overrides `input` of the pipeline file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output LAS file, overrides `output` of the pipeline file"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        command()
            .try_get_matches_from(args)
            .map(|m| Self::from_matches(&m))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
            input: matches.get_one::<String>("input").map(PathBuf::from),
            output: matches.get_one::<String>("output").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}
