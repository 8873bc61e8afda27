//! Option registry
//!
//! Stores the options constructed for one invocation, in token order, and
//! enforces the invariants that span them: every option must validate, no
//! two options may share a name, and exactly one primary operation must be
//! present. Execution proceeds validate-all, process-all, execute-all, with
//! each option's execution failure isolated from the rest.

use crate::context::RunContext;
use crate::options::SensorOption;

/// The ordered collection of options for one invocation. Rebuilt fully on
/// each top-level invocation.
pub struct OptionRegistry {
    options: Vec<Box<dyn SensorOption>>,
    parsed: bool,
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self {
            options: Vec::new(),
            parsed: true,
        }
    }

    /// Adds an option. No checking happens here; invariants are tested by
    /// [`OptionRegistry::is_options_valid`].
    pub fn add_option(&mut self, option: Box<dyn SensorOption>) {
        self.options.push(option);
    }

    /// Marks the registry as the product of a failed token scan; execution
    /// is suppressed but already-constructed options remain inspectable.
    pub fn mark_unparsed(&mut self) {
        self.parsed = false;
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    pub fn options(&self) -> &[Box<dyn SensorOption>] {
        &self.options
    }

    /// True when every option validates and no two options share a name.
    /// Emits a diagnostic for the first failure found.
    pub fn is_options_valid(&self, ctx: &RunContext) -> bool {
        for option in &self.options {
            if !option.is_valid(ctx) {
                return false;
            }
        }
        for (index, option) in self.options.iter().enumerate() {
            let duplicated = self.options[..index]
                .iter()
                .any(|earlier| earlier.name() == option.name());
            if duplicated {
                ctx.fire_message(&format!(
                    "The {} option may only be specified once.",
                    option.name()
                ));
                return false;
            }
        }
        true
    }

    /// True when exactly one primary operation is registered. The two
    /// failure modes get distinct diagnostics.
    pub fn has_required_options(&self, ctx: &RunContext) -> bool {
        let primaries = self
            .options
            .iter()
            .filter(|option| option.is_primary())
            .count();
        match primaries {
            0 => {
                ctx.fire_message("A -file, -argList, or -migration option must be provided.");
                false
            }
            1 => true,
            _ => {
                ctx.fire_message(
                    "Error: only one of -file, -argList, or -migration may be specified per run.",
                );
                false
            }
        }
    }

    /// Runs the process phase of every option, in registration order.
    pub fn process_options(&self, ctx: &mut RunContext) {
        for option in &self.options {
            option.process(ctx);
        }
    }

    /// Runs the execute phase of every option, in registration order. One
    /// option's failure is reported and does not stop the others.
    pub fn execute_options(&self, ctx: &mut RunContext) {
        for option in &self.options {
            if let Err(error) = option.execute(ctx) {
                ctx.fire_message(&format!(
                    "Error: the {} option failed: {}",
                    option.name(),
                    error
                ));
            }
        }
    }

    /// Validates, processes, and (when the registry is well formed) executes
    /// every option. Returns true only if the execute phase ran.
    pub fn run(&self, ctx: &mut RunContext) -> bool {
        if !self.parsed {
            return false;
        }
        if !self.is_options_valid(ctx) {
            return false;
        }
        self.process_options(ctx);
        if !self.has_required_options(ctx) {
            return false;
        }
        self.execute_options(ctx);
        true
    }
}
