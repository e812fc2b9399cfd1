use anyhow::Result;
use clap::Parser;
use mf_app::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("melfeat v{}", env!("CARGO_PKG_VERSION"));
    mf_app::pipeline::run(&cli)
}
