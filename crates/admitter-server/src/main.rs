//! Admitter server - serves the mutating admission webhook

mod config;
mod error;
mod server;
mod telemetry;

use clap::Parser;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // TLS needs a process-wide crypto provider before any config is built
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        anyhow::bail!("failed to install crypto provider: {e:?}");
    }

    let config = Config::parse();
    telemetry::init_tracing(config.log_format)?;

    server::run(config).await?;
    Ok(())
}
