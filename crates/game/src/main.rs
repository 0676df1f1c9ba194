use std::env;
use std::process::ExitCode;

mod app;

use app::CliCommand;

fn main() -> ExitCode {
    let args = env::args().skip(1).collect::<Vec<_>>();
    match app::parse_cli_args(&args) {
        Ok(CliCommand::Run(cli)) => app::run(cli),
        Ok(CliCommand::Help) => {
            println!("{}", app::usage_text());
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}
