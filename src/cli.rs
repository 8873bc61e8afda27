use clap::Parser;
use std::path::PathBuf;

/// Command-line shell of the XML data sensor.
///
/// Only `--config`, `--help`, and `--version` are handled here; everything
/// else is passed verbatim to the sensor's own option resolver, which owns
/// the `-sdt`/`-file`-style option language.
#[derive(Parser, Debug, Clone)]
#[command(name = "xmldata-sensor")]
#[command(about = "Send XML sensor data entries to a remote collector")]
#[command(version)]
pub struct Cli {
    /// Path to the sensor configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sensor options, e.g. `-sdt FileMetric -file data.xml`
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "OPTIONS"
    )]
    pub tokens: Vec<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
