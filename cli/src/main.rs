//! `solguard` binary entry point.

mod cli;
mod commands;

use clap::Parser;
use solguard_core::ApiError;
use solguard_core::ConfigLoader;
use solguard_core::DashboardClient;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(home) = cli.home {
        loader = loader.with_home(home);
    }
    let mut config = loader.load()?;
    if let Some(url) = &cli.base_url {
        config.set_api_base_url(url)?;
    }

    let client = DashboardClient::new(config)?;
    commands::run(&client, cli.command).await
}

#[allow(clippy::print_stderr)]
fn report(err: &anyhow::Error) {
    eprintln!("error: {err}");
    if let Some(api) = err.downcast_ref::<ApiError>() {
        if api.is_unauthorized() {
            eprintln!("hint: your session is not valid; run `solguard login --email <EMAIL>`");
        }
        return;
    }
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}
