use std::process::ExitCode;

fn main() -> ExitCode {
    vendorgate_cli::run()
}
