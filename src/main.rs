//! buf-push-action binary entry point.

use std::process::ExitCode;

use bufpush::ui::output::error_line;

fn main() -> ExitCode {
    match bufpush::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // `{:#}` keeps any added context on the same line.
            eprintln!("{}", error_line(format!("{:#}", err)));
            ExitCode::FAILURE
        }
    }
}
