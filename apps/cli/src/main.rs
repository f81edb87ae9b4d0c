//! TagTrace CLI: device-tag discovery and wire routing for schematic PDFs.
//!
//! Finds where every device tag is printed in a schematic document, matches
//! tag lists against it and routes wires between placed components.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
