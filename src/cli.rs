//! CLI domain: parse, route and output only.
//! No engine orchestration beyond building the registry and handing off to the controller.

mod output;
mod parse;
mod route;

pub use output::{format_info, format_plan, format_run_summary, map_error};
pub use parse::{Cli, Commands};
pub use route::RunContext;
