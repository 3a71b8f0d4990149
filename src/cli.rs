//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_check_report_json, format_check_report_text, format_job_json, format_job_list_json,
    format_job_list_text, format_job_text, format_run_result_json, format_run_result_text,
};
pub use route::RunContext;
