use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use super::config::duration::parse_duration;

/// DNS rebinding server for SSRF testing
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// IP address to return on the first request
    #[arg(long, value_name = "IPV4", required = true)]
    pub valid: Option<Ipv4Addr>,

    /// IP address to return on subsequent requests
    #[arg(long, value_name = "IPV4", required = true)]
    pub internal: Option<Ipv4Addr>,

    /// Target domain, queries for it (and subdomains) are rebound, others proxied
    #[arg(long, required = true)]
    pub domain: Option<String>,

    /// UDP port to listen on
    #[arg(long, default_value_t = 53)]
    pub port: u16,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Upstream DNS server for non-matching domains
    #[arg(long, default_value = "8.8.8.8:53")]
    pub upstream: SocketAddr,

    /// Upstream timeout, e.g. 2s or 500ms
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// YAML file with static records
    #[arg(long, value_name = "FILE_PATH")]
    pub records: Option<PathBuf>,

    /// Log file (default: stdout)
    #[arg(long, value_name = "FILE_PATH")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the version and exit
    Version,
}
