use std::process::ExitCode;

fn main() -> ExitCode {
    copilot_cli::run()
}
