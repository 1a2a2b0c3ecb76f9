use anyhow::Result;
use clap::Parser;
use ssrf_dns_core::DNSServer;
use ssrf_dns_core::RebindEngine;
use ssrf_dns_core::StaticRecords;
use ssrf_dns_core::UdpUpstream;
use tokio::signal;
use tracing::{error, info};

mod config;
mod logging;
use config::{load_static_records, Args, Command, Config};

const PROG_NAME: &str = env!("CARGO_BIN_NAME");
const PROG_VERSION: &str = env!("CARGO_PKG_VERSION");

// ----------------------
//     server setup
// ----------------------

/// Create the rebinding DNS Server, binding its socket
async fn create_dns_server(
    config: &Config,
    records: StaticRecords,
) -> Result<DNSServer<UdpUpstream>> {
    let upstream = UdpUpstream::new(config.upstream, config.timeout);
    let engine = RebindEngine::new(
        config.domain.clone(),
        config.rebind_addrs(),
        records,
        upstream,
    );

    DNSServer::bind(config.listen_at, engine).await
}

async fn serve(config: Config) -> Result<()> {
    let records = load_static_records(config.records.as_ref())?;
    let server = create_dns_server(&config, records).await?;

    info!("dns server is listening at {}", server.listen_at()?);
    info!("target domain: {} (and subdomains)", config.domain);
    if !server.engine().records().is_empty() {
        info!("loaded {} static records", server.engine().records().len());
    }
    info!("first query: {}", config.valid);
    info!("subsequent queries: {}", config.internal);
    info!("upstream: {}", config.upstream);

    server.serve().await
}

// ----------------------
//        main
// ----------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.command == Some(Command::Version) {
        println!("{PROG_NAME} version {PROG_VERSION}");
        return Ok(());
    }

    let config = Config::try_from(args)?;
    logging::init(config.log.as_deref())?;

    info!("{PROG_NAME} version: {PROG_VERSION}, starting");

    tokio::select! {
        res = serve(config) => {
            if let Err(err) = res {
                error!(cause = %err, "Failed to start");
                return Err(err);
            }
        }
        _ = signal::ctrl_c() => {
            info!("{PROG_NAME} is shutting down.");
        }
    }
    info!("Exiting...");

    Ok(())
}
