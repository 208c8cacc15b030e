use std::process::ExitCode;

fn main() -> ExitCode {
    match medmap::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
