use clap::Parser;
use gcodestream::cli::{run, Cli};
use gcodestream::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    run(&cli)
}
