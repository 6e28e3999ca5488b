use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dhcp::config::Config;
use dhcp::runtime::ControlledServer;

#[derive(Parser)]
#[command(name = "ember-dhcpd", about = "Stateless two-tier DHCPv4 request processor")]
struct Cli {
    /// Sets a custom config file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "/etc/ember/dhcpd.json"
    )]
    config: PathBuf,

    /// Enables verbose output on STDOUT
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)?;
    init_logging(&config, cli.verbose)?;

    let mut server = ControlledServer::with_config(&cli.config, config);
    server.start().await?;
    info!(config = %cli.config.display(), "ember-dhcpd started");

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = terminate.recv() => break,
            _ = hangup.recv() => {
                if let Err(error) = server.reconfig().await {
                    error!(%error, "reconfiguration failed, previous configuration restored");
                }
            }
        }
    }

    server.stop().await;
    Ok(())
}

fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let default_level = if verbose {
        "debug"
    } else {
        config
            .dhcp4
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_dir = config
        .dhcp4
        .logging
        .as_ref()
        .filter(|l| l.enable)
        .and_then(|l| l.dir.clone());

    match log_dir {
        Some(dir) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("ember-dhcpd.log"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}
