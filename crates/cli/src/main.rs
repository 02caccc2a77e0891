use std::process::ExitCode;

fn main() -> ExitCode {
    helpline_cli::run()
}
