// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments and hand off to
//   `cli::App::run`.
// - Errors are printed once here; delete usage errors exit with 2.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use crossterm::style::Stylize;
use seedr_cli::cli::App;
use seedr_cli::error::DeleteError;

fn main() -> ExitCode {
    let env = env_logger::Env::default()
        .filter_or("SEEDR_LOG_LEVEL", "warn")
        .write_style_or("SEEDR_LOG_STYLE", "auto");
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(false)
        .format_module_path(false)
        .init();

    let app = App::parse();
    match app.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            _ = writeln!(io::stderr(), "{} {:#}", "Error:".red().bold(), err);
            let code = err
                .downcast_ref::<DeleteError>()
                .map_or(1, DeleteError::exit_code);
            ExitCode::from(code)
        }
    }
}
