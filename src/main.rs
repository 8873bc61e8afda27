use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use xmldata_sensor::cli::Cli;
use xmldata_sensor::collector::HttpCollector;
use xmldata_sensor::config::SensorConfig;
use xmldata_sensor::context::RunContext;
use xmldata_sensor::output::ConsoleSink;
use xmldata_sensor::resolver;
use xmldata_sensor::schema::{SchemaProvider, TomlSchemaCatalog};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = match &cli.config {
        Some(path) => SensorConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SensorConfig::load_or_default()?,
    };

    let schema_provider: Arc<dyn SchemaProvider> = match &config.schema_catalog {
        Some(path) => Arc::new(TomlSchemaCatalog::from_file(path).with_context(|| {
            format!("failed to load the schema catalog from {}", path.display())
        })?),
        None => Arc::new(TomlSchemaCatalog::built_in()),
    };

    let collector = HttpCollector::new(config.collector_config())
        .context("failed to initialize the collector client")?;

    let mut ctx = RunContext::new(
        schema_provider,
        Box::new(collector),
        Box::new(ConsoleSink::new()),
    );
    ctx.host = config.collector_url.clone();
    ctx.flush_threshold = config.flush_threshold;

    Ok(resolver::run_invocation(&cli.tokens, &mut ctx))
}
