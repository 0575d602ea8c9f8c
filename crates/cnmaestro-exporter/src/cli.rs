//! Clap derive structure for the `cnmaestro-exporter` binary.

use std::path::PathBuf;

use clap::Parser;

/// cnmaestro-exporter -- Prometheus exporter for cnMaestro WiFi fleets
#[derive(Debug, Parser)]
#[command(
    name = "cnmaestro-exporter",
    version,
    about = "Expose cnMaestro AP group and guest portal state as Prometheus metrics",
    long_about = "Logs in to a Cambium cnMaestro cloud controller, keeps the session fresh \
        and serves per-AP-group and per-portal metrics on demand.\n\n\
        Credentials may also come from CNMAESTRO_USERNAME, CNMAESTRO_PASSWORD, \
        CNMAESTRO_SESSION_ID and CNMAESTRO_XSRF_TOKEN."
)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, short = 'c', env = "CNMAESTRO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to serve metrics on (overrides the config file)
    #[arg(long, short = 'l')]
    pub listen_address: Option<String>,

    /// Log in once, print the obtained session and exit
    #[arg(long)]
    pub login: bool,

    /// Print the effective configuration (secrets masked) and exit
    #[arg(long, conflicts_with = "login")]
    pub print_config: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}
