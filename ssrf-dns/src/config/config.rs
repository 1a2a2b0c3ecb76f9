use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use ssrf_dns_core::RebindAddrs;

use super::cli::Args;

/// Server configuration, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct Config {
    /// Address handed out on the first lookup of a name
    pub valid: Ipv4Addr,
    /// Address handed out on every later lookup
    pub internal: Ipv4Addr,
    /// Suffix of the names that get rebound
    pub domain: String,
    /// DNS Server listening address
    pub listen_at: SocketAddr,
    /// Upstream DNS Server for everything else
    pub upstream: SocketAddr,
    /// Timeout for Upstream DNS.
    pub timeout: Duration,
    /// Static records file
    pub records: Option<PathBuf>,
    /// Log file, stdout when empty
    pub log: Option<PathBuf>,
}

impl Config {
    pub fn rebind_addrs(&self) -> RebindAddrs {
        RebindAddrs::new(self.valid, self.internal)
    }

    fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            return Err(anyhow::format_err!("--domain must not be empty"));
        }
        Ok(())
    }
}

impl TryFrom<Args> for Config {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        let (Some(valid), Some(internal), Some(domain)) = (args.valid, args.internal, args.domain)
        else {
            return Err(anyhow::format_err!(
                "--valid, --internal and --domain flags are required"
            ));
        };

        let config = Config {
            valid,
            internal,
            domain,
            listen_at: SocketAddr::new(args.bind, args.port),
            upstream: args.upstream,
            timeout: args.timeout,
            records: args.records,
            log: args.log,
        };
        config.validate()?;
        Ok(config)
    }
}

pub(crate) mod duration {
    use std::time::Duration;

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let mut num = Vec::with_capacity(100);
        let mut chars = Vec::with_capacity(100);
        for c in s.chars() {
            if c.is_ascii_digit() {
                num.push(c)
            } else {
                chars.push(c);
            }
        }
        let n: u64 = num
            .into_iter()
            .collect::<String>()
            .parse()
            .map_err(|_| format!("invalid value: {}, expected 10s or 10ms", &s))?;
        match chars.into_iter().collect::<String>().as_str() {
            "s" => Ok(Duration::from_secs(n)),
            "ms" => Ok(Duration::from_millis(n)),
            _ => Err(format!("invalid value: {}, expected 10s or 10ms", &s)),
        }
    }
}
