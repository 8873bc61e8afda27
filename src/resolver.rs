//! Argument resolution
//!
//! Turns a flat token list into option/parameter groups. A token is a flag
//! iff it is non-empty and begins with the reserved prefix character; each
//! flag opens a group that collects the non-flag tokens after it. A repeated
//! flag, or a leading token that is not a flag, is a fatal parse error: the
//! scan stops, the registry is marked unparsed, and execution is suppressed.

use crate::context::RunContext;
use crate::options::{self, OPTION_PREFIX};
use crate::registry::OptionRegistry;

pub struct ArgumentResolver;

impl ArgumentResolver {
    /// True if the token is an option flag.
    pub fn is_flag(token: &str) -> bool {
        token.starts_with(OPTION_PREFIX)
    }

    /// Scans `tokens` left to right, constructing one option per flag group
    /// and registering it. Returns false on a fatal parse error; options
    /// constructed before the error remain registered but the registry is
    /// marked unparsed.
    pub fn resolve(tokens: &[String], registry: &mut OptionRegistry, ctx: &RunContext) -> bool {
        if tokens.is_empty() {
            ctx.fire_message("Invalid arguments: no options were provided.");
            registry.mark_unparsed();
            return false;
        }

        let mut seen = std::collections::HashSet::new();
        let mut open_group: Option<(String, Vec<String>)> = None;
        for token in tokens {
            if Self::is_flag(token) {
                if let Some((name, parameters)) = open_group.take() {
                    registry.add_option(options::create_option(&name, parameters));
                }
                if !seen.insert(token.clone()) {
                    ctx.fire_message(&format!(
                        "The {} option may only be specified once.",
                        token
                    ));
                    registry.mark_unparsed();
                    return false;
                }
                open_group = Some((token.clone(), Vec::new()));
            } else {
                match open_group.as_mut() {
                    Some((_, parameters)) => parameters.push(token.clone()),
                    None => {
                        ctx.fire_message(&format!(
                            "Invalid arguments: '{}' is not an option.",
                            token
                        ));
                        registry.mark_unparsed();
                        return false;
                    }
                }
            }
        }
        if let Some((name, parameters)) = open_group.take() {
            registry.add_option(options::create_option(&name, parameters));
        }
        true
    }
}

/// Builds a fresh registry for `tokens`, resolves them, and runs the result.
/// Returns true only if the registry's execute phase ran.
pub fn run_invocation(tokens: &[String], ctx: &mut RunContext) -> bool {
    let mut registry = OptionRegistry::new();
    if !ArgumentResolver::resolve(tokens, &mut registry, ctx) {
        return false;
    }
    registry.run(ctx)
}
