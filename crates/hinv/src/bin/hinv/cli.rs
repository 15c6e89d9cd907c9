//! hinv cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; hinv ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve an inventory and print its groups and hosts
    ///
    /// The inventory may be a definition file, a comma separated list of hosts,
    /// a connector or a resolvable host name
    #[command(alias = "inv")]
    Resolve(ResolveCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct ResolveCommand {
    /// Inventory descriptor
    pub inventory: String,

    /// Override data applied to every host, `key=value`
    ///
    /// The value is read as an HCL expression (`port=22`, `tags=["a", "b"]`)
    /// and taken as a plain string when it is not one.
    #[clap(short = 'd', long = "data", value_parser = parse_key_value)]
    pub data: Vec<(String, String)>,

    /// Additional group_data directory, searched after the default ones
    #[clap(short = 'g', long = "group-data")]
    pub group_data: Vec<PathBuf>,

    /// Only print the merged data of this host
    #[clap(long = "host")]
    pub host: Option<String>,

    #[clap(flatten)]
    pub output: OutputArgs,
}

fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{arg}`")),
    }
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Parsed root attributes of a file
    Document { file: PathBuf },
    /// Evaluated bindings of a file
    Bindings {
        file: PathBuf,
        #[clap(flatten)]
        output: OutputArgs,
    },
}
