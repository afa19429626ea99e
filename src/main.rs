use instance_configs::error::CliError;

fn main() {
    if let Err(error) = instance_configs::run() {
        // Command failures were already written to stdout by the runner.
        if !matches!(error, CliError::Command { .. }) {
            eprintln!("{error}");
        }
        if let Some(tip) = error.tip() {
            eprintln!("{tip}");
        }
        std::process::exit(error.exit_code());
    }
}
