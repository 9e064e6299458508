mod cli;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    berth_observe::init_logger(&cli.logger_config())?;

    cli::run(cli.command, &mut std::io::stdout())
}
