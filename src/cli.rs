//! CLI domain: parse, route, output, and presentation only.
//! No pipeline logic; a single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands};
pub use route::{enhance_file, CommandOutput, EnhanceOverrides, EnhanceSummary, RunContext};
