//! Sensor options
//!
//! Every command token group becomes one option with three phases: `is_valid`
//! checks parameter counts and contents, `process` publishes values into the
//! run context, and `execute` performs the option's side effect. Most options
//! only configure shared state; the primary operations (`-file`, `-argList`,
//! `-migration`) do the actual ingestion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::batch::{BatchAccumulator, FlushMode, SendOutcome};
use crate::context::RunContext;
use crate::entry::{self, RawEntry};
use crate::error::Result;
use crate::property_map::PropertyMap;
use crate::record::{self, CanonicalRecord};
use crate::resolver;
use crate::transformer::{EntryTransformer, Transformed};
use crate::tstamp::{self, TimestampResolver, UniqueTstampSet};

/// The reserved prefix character that marks a token as an option flag.
pub const OPTION_PREFIX: char = '-';

/// A named, parameterized unit of configuration.
///
/// Name and parameters are fixed at construction. `is_valid` is side-effect
/// free apart from diagnostics and may be called any number of times;
/// `process` and `execute` run at most once per registry cycle.
pub trait SensorOption {
    fn name(&self) -> &str;

    fn parameters(&self) -> &[String];

    /// Checks this option's parameters, emitting a diagnostic on failure.
    fn is_valid(&self, ctx: &RunContext) -> bool;

    /// True for the mutually exclusive primary operations.
    fn is_primary(&self) -> bool {
        false
    }

    /// Publishes values into shared run state before execution.
    fn process(&self, _ctx: &mut RunContext) {}

    /// Performs the option's side effect.
    fn execute(&self, _ctx: &mut RunContext) -> Result<()> {
        Ok(())
    }
}

/// Builds the option matching a flag name; unknown flags become the
/// [`UnsupportedOption`] sentinel.
pub fn create_option(name: &str, parameters: Vec<String>) -> Box<dyn SensorOption> {
    match name {
        SdtOption::NAME => Box::new(SdtOption { parameters }),
        FileOption::NAME => Box::new(FileOption { parameters }),
        ArgListOption::NAME => Box::new(ArgListOption { parameters }),
        VerboseOption::NAME => Box::new(VerboseOption { parameters }),
        UniqueTstampOption::NAME => Box::new(UniqueTstampOption { parameters }),
        ResourceOption::NAME => Box::new(ResourceOption { parameters }),
        SetRuntimeOption::NAME => Box::new(SetRuntimeOption { parameters }),
        NameMapOption::NAME => Box::new(NameMapOption { parameters }),
        MigrationOption::NAME => Box::new(MigrationOption { parameters }),
        _ => Box::new(UnsupportedOption {
            name: name.to_string(),
            parameters,
        }),
    }
}

/// Requires the option to have no parameters.
fn require_no_parameters(option: &dyn SensorOption, ctx: &RunContext) -> bool {
    if option.parameters().is_empty() {
        return true;
    }
    ctx.fire_message(&format!(
        "The {} option must have no arguments. Ex: {}.",
        option.name(),
        option.name()
    ));
    false
}

/// Reports the final disposition of a send-capable run.
fn report_send_outcome(ctx: &RunContext, outcome: &SendOutcome) {
    if outcome.sent > 0 || !outcome.any_offline() {
        ctx.fire_message(&format!("{} entries sent to {}.", outcome.sent, ctx.host));
    }
    if outcome.any_offline() {
        ctx.fire_message(&format!(
            "Server not available. Storing {} data entries offline.",
            outcome.stored_offline
        ));
    }
}

/// `-sdt <name>`: sets the run's default sensor data type. An entry's own
/// sdt attribute still overrides it per entry.
pub struct SdtOption {
    parameters: Vec<String>,
}

impl SdtOption {
    pub const NAME: &'static str = "-sdt";
}

impl SensorOption for SdtOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        if self.parameters.len() == 1 {
            return true;
        }
        ctx.fire_message("The -sdt option must have only one argument. Ex: -sdt FileMetric.");
        false
    }

    fn process(&self, ctx: &mut RunContext) {
        ctx.sdt_name = Some(self.parameters[0].clone());
    }
}

/// `-file <file>...`: sends the entries of one or more XML data files.
pub struct FileOption {
    parameters: Vec<String>,
}

impl FileOption {
    pub const NAME: &'static str = "-file";
}

impl SensorOption for FileOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_primary(&self) -> bool {
        true
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        if self.parameters.is_empty() {
            ctx.fire_message(
                "The number of parameters must include at least 1 file. Ex: -file foo.xml foo2.xml",
            );
            return false;
        }
        for parameter in &self.parameters {
            if !Path::new(parameter).exists() {
                ctx.fire_message(&format!("The file '{}' does not exist.", parameter));
                return false;
            }
        }
        true
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<()> {
        // Reachability is reported up front, never retried; the collector
        // spools to offline storage when the endpoint stays unavailable.
        if !ctx.collector.is_reachable() {
            ctx.fire_message(&format!(
                "The host, {}, could not be reached. Data will be stored offline.",
                ctx.host
            ));
        }

        let mut transformer =
            EntryTransformer::new(Arc::clone(&ctx.schema_provider), ctx.transform_settings());
        let mut tstamps = ctx.new_tstamp_resolver();
        let mut batch = BatchAccumulator::new(FlushMode::SingleShot, ctx.flush_threshold);

        for file in &self.parameters {
            ctx.fire_verbose(&format!("Sending data from: {}", file));
            let entries = match entry::read_entries(Path::new(file)) {
                Ok(entries) => entries,
                // One unreadable file must not block the rest of the batch.
                Err(error) => {
                    ctx.fire_message(&format!(
                        "Error: the file {} could not be processed: {}",
                        file, error
                    ));
                    continue;
                }
            };

            let mut accepted_in_file = 0usize;
            for (index, raw) in entries.iter().enumerate() {
                match transformer.transform(raw, index + 1, tstamps.as_mut())? {
                    Transformed::Accepted(canonical) => {
                        ctx.fire_verbose(&canonical.verbose_string());
                        batch.accept(ctx, &canonical)?;
                        accepted_in_file += 1;
                    }
                    Transformed::Rejected(rejection) => ctx.fire_message(&rejection.to_string()),
                }
            }
            if accepted_in_file == 0 {
                ctx.fire_message(&format!("No data was sent from {}.", file));
            } else {
                ctx.fire_verbose(&format!(
                    "{} entries processed from {}.",
                    accepted_in_file, file
                ));
            }
        }

        let outcome = batch.finish(ctx)?;
        ctx.collector.close()?;
        report_send_outcome(ctx, &outcome);
        Ok(())
    }
}

/// `-argList <file>`: loads a whole token list from a text file and runs it
/// as a fresh invocation.
pub struct ArgListOption {
    parameters: Vec<String>,
}

impl ArgListOption {
    pub const NAME: &'static str = "-argList";
}

impl SensorOption for ArgListOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_primary(&self) -> bool {
        true
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        if self.parameters.len() != 1 {
            ctx.fire_message(
                "The -argList option only accepts one parameter, which is the file \
                 containing the command-line arguments.",
            );
            return false;
        }
        if !Path::new(&self.parameters[0]).exists() {
            ctx.fire_message(&format!(
                "The specified file, {}, does not exist.",
                self.parameters[0]
            ));
            return false;
        }
        true
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<()> {
        let contents = std::fs::read_to_string(&self.parameters[0])?;
        let tokens: Vec<String> = contents
            .split_whitespace()
            .map(str::to_string)
            .collect();
        ctx.fire_verbose(&format!(
            "Running {} arguments loaded from {}.",
            tokens.len(),
            self.parameters[0]
        ));
        // A fresh registry is built for the loaded token list.
        resolver::run_invocation(&tokens, ctx);
        Ok(())
    }
}

/// `-verbose`: turns on per-entry progress output.
pub struct VerboseOption {
    parameters: Vec<String>,
}

impl VerboseOption {
    pub const NAME: &'static str = "-verbose";
}

impl SensorOption for VerboseOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        require_no_parameters(self, ctx)
    }

    fn process(&self, ctx: &mut RunContext) {
        ctx.verbose = true;
    }
}

/// `-uniqueTimestamps`: guarantees every record of the run a timestamp no
/// other record received. Removes data collisions at the cost of drifting
/// from the timestamps the source actually reported.
pub struct UniqueTstampOption {
    parameters: Vec<String>,
}

impl UniqueTstampOption {
    pub const NAME: &'static str = "-uniqueTimestamps";
}

impl SensorOption for UniqueTstampOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        require_no_parameters(self, ctx)
    }

    fn process(&self, ctx: &mut RunContext) {
        ctx.unique_tstamps = true;
    }
}

/// `-resource <resource>`: the resource associated with every entry that
/// does not name its own.
pub struct ResourceOption {
    parameters: Vec<String>,
}

impl ResourceOption {
    pub const NAME: &'static str = "-resource";
}

impl SensorOption for ResourceOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        if self.parameters.len() == 1 {
            return true;
        }
        ctx.fire_message(
            "The -resource option must have only one argument. Ex: -resource <resource>.",
        );
        false
    }

    fn process(&self, ctx: &mut RunContext) {
        ctx.resource = Some(self.parameters[0].clone());
    }
}

/// `-setRuntime`: marks all data sent by this invocation as one batch by
/// giving every record the same runtime value.
pub struct SetRuntimeOption {
    parameters: Vec<String>,
}

impl SetRuntimeOption {
    pub const NAME: &'static str = "-setRuntime";
}

impl SensorOption for SetRuntimeOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        require_no_parameters(self, ctx)
    }

    fn process(&self, ctx: &mut RunContext) {
        ctx.set_runtime = true;
    }
}

/// `-nameMap <raw> <canonical> [...]`: maps attribute names as they appear
/// in the data files to the names the sensor data types require.
pub struct NameMapOption {
    parameters: Vec<String>,
}

impl NameMapOption {
    pub const NAME: &'static str = "-nameMap";
}

impl SensorOption for NameMapOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        if !self.parameters.is_empty() && self.parameters.len() % 2 == 0 {
            return true;
        }
        ctx.fire_message(
            "The -nameMap option requires one or more pairs of names. \
             Ex: -nameMap elapsedTime time.",
        );
        false
    }

    fn process(&self, ctx: &mut RunContext) {
        for pair in self.parameters.chunks_exact(2) {
            ctx.name_map.insert(pair[0].clone(), pair[1].clone());
        }
    }
}

/// `-migration <dir>`: ports a legacy data directory, laid out as
/// `<dir>/<sdtName>/<file.xml>`, to canonical records. Legacy `tstamp`
/// attributes become unique timestamps, `file`/`path` become the resource,
/// and encoded `pMap` attributes are decoded and inlined.
pub struct MigrationOption {
    parameters: Vec<String>,
}

impl MigrationOption {
    pub const NAME: &'static str = "-migration";

    fn migrate_entry(
        raw: &RawEntry,
        sdt_name: &str,
        tstamps: &mut UniqueTstampSet,
    ) -> std::result::Result<CanonicalRecord, String> {
        let mut canonical = CanonicalRecord::new();
        canonical.set(record::SENSOR_DATA_TYPE, sdt_name);

        let mut candidate_millis = tstamp::now_millis();
        for (name, value) in raw.iter() {
            if name.eq_ignore_ascii_case(record::RAW_TSTAMP) {
                candidate_millis = tstamp::parse_timestamp_millis(value)
                    .map_err(|error| error.to_string())?;
            } else if name.eq_ignore_ascii_case("file") || name.eq_ignore_ascii_case("path") {
                canonical.set(record::RESOURCE, value);
            } else if name.eq_ignore_ascii_case(record::PROPERTY_MAP) {
                let properties =
                    PropertyMap::from_encoded(value).map_err(|error| error.to_string())?;
                for key in properties.keys() {
                    if let Some(property_value) = properties.get(&key) {
                        canonical.set(key, property_value);
                    }
                }
            } else {
                canonical.set(name, value);
            }
        }

        // Legacy batches routinely repeat timestamps, so migration always
        // uniquifies.
        let resolved = tstamps.resolve(candidate_millis);
        let timestamp = tstamp::format_timestamp(resolved)
            .ok_or_else(|| format!("timestamp {} is out of range", resolved))?;
        canonical.set(record::TIMESTAMP, timestamp);
        Ok(canonical)
    }
}

impl SensorOption for MigrationOption {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_primary(&self) -> bool {
        true
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        if self.parameters.len() != 1 {
            ctx.fire_message(
                "The -migration option only accepts one parameter, \
                 which is the legacy data directory.",
            );
            return false;
        }
        if !Path::new(&self.parameters[0]).is_dir() {
            ctx.fire_message(&format!(
                "The legacy data directory, {}, does not exist.",
                self.parameters[0]
            ));
            return false;
        }
        true
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<()> {
        let root = PathBuf::from(&self.parameters[0]);
        let mut tstamps = UniqueTstampSet::new();
        let mut batch = BatchAccumulator::new(FlushMode::Streamed, ctx.flush_threshold);

        let mut sdt_dirs: Vec<PathBuf> = std::fs::read_dir(&root)?
            .filter_map(|dir_entry| dir_entry.ok())
            .map(|dir_entry| dir_entry.path())
            .filter(|path| path.is_dir())
            .collect();
        sdt_dirs.sort();

        for sdt_dir in sdt_dirs {
            let sdt_name = sdt_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut data_files: Vec<PathBuf> = std::fs::read_dir(&sdt_dir)?
                .filter_map(|dir_entry| dir_entry.ok())
                .map(|dir_entry| dir_entry.path())
                .filter(|path| path.is_file())
                .collect();
            data_files.sort();

            for data_file in data_files {
                ctx.fire_verbose(&format!("Processing {}", data_file.display()));
                let entries = match entry::read_entries(&data_file) {
                    Ok(entries) => entries,
                    Err(error) => {
                        ctx.fire_message(&format!(
                            "Error: the file {} could not be processed: {}",
                            data_file.display(),
                            error
                        ));
                        continue;
                    }
                };
                for (index, raw) in entries.iter().enumerate() {
                    match Self::migrate_entry(raw, &sdt_name, &mut tstamps) {
                        Ok(canonical) => {
                            ctx.fire_verbose(&canonical.verbose_string());
                            batch.accept(ctx, &canonical)?;
                        }
                        Err(reason) => ctx.fire_message(&format!(
                            "Error: legacy entry {} in {} could not be converted: {}. \
                             Data will not be sent from the element.",
                            index + 1,
                            data_file.display(),
                            reason
                        )),
                    }
                }
            }
        }

        let outcome = batch.finish(ctx)?;
        ctx.collector.close()?;
        report_send_outcome(ctx, &outcome);
        Ok(())
    }
}

/// Sentinel for flags no factory entry recognizes; always invalid.
pub struct UnsupportedOption {
    name: String,
    parameters: Vec<String>,
}

impl SensorOption for UnsupportedOption {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn is_valid(&self, ctx: &RunContext) -> bool {
        ctx.fire_message(&format!("The '{}' option is not supported.", self.name));
        false
    }
}
