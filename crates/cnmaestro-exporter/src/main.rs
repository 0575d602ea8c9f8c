mod cli;
mod error;
mod server;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cnmaestro_config::{config_path, load_config};
use cnmaestro_core::Controller;

use crate::cli::Cli;
use crate::error::ExporterError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), ExporterError> {
    // An explicit --config must exist; the default location is optional.
    let (path, required) = match cli.config {
        Some(path) => (path, true),
        None => (config_path(), false),
    };
    debug!(path = %path.display(), "loading config");
    let mut config = load_config(&path, required)?;

    if let Some(addr) = cli.listen_address {
        config.exporter.listen_address = addr;
    }
    let addr = config.listen_address()?;

    if cli.print_config {
        print!("{}", config.to_redacted_toml()?);
        return Ok(());
    }

    let controller = Controller::new(config.to_controller_config()?)?;
    let info = controller.connect().await?;

    if cli.login {
        println!("session_id = {}", info.session_id);
        println!("xsrf_token = {}", info.csrf_token);
        return Ok(());
    }

    server::serve(controller, addr, config.scrape_timeout()).await
}
