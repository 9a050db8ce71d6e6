// SerialTerm - Interactive serial port terminal
use clap::Parser;
use serialterm::cli::{execute_command, Args};
use serialterm::SerialTermError;

/// Errors returned here are printed as `Error: ...` with exit code 1.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("SerialTERM v{}", env!("CARGO_PKG_VERSION"));

    match execute_command(args).await {
        Ok(()) | Err(SerialTermError::SelectionAborted) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
