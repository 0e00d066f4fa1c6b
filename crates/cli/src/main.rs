use std::process::ExitCode;

fn main() -> ExitCode {
    transpak_cli::run()
}
