// Repo Weaver - command line entry point

use clap::Parser;
use repo_weaver::{run_main, Cli};

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let success = runtime.block_on(async {
        let cli = Cli::parse();
        run_main(cli).await
    })?;
    if !success {
        std::process::exit(1);
    }
    Ok(())
}
