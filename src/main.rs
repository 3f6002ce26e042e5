use clap::Parser;

use strato_bench::cli::{self, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    cli::run(Cli::parse()).await
}
