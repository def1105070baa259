use clap::Parser;
use std::path::PathBuf;

/// Generates test cases from business requirement documents.
#[derive(Parser, Debug)]
#[command(name = "brd-testgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./brd-testgen.toml when present)
    #[arg(long, env = "BRD_TESTGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = brd_testgen_lib::run(cli.config, cli.port).await {
        eprintln!("brd-testgen: {}", e);
        std::process::exit(1);
    }
}
