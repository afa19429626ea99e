pub mod admin;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod name;
pub mod ops;
pub mod output;

pub async fn run_async() -> Result<(), error::CliError> {
    cli::run().await
}

pub fn run() -> Result<(), error::CliError> {
    let runtime = tokio::runtime::Runtime::new().map_err(error::CliError::RuntimeInit)?;
    runtime.block_on(run_async())
}
