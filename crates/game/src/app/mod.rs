mod bootstrap;
mod config;
mod gameplay;
mod loop_runner;

pub(crate) use bootstrap::{parse_cli_args, usage_text, CliCommand};
pub(crate) use loop_runner::run;
