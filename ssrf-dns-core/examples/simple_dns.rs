use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Result;
use ssrf_dns_core::DNSServer;
use ssrf_dns_core::RebindAddrs;
use ssrf_dns_core::RebindEngine;
use ssrf_dns_core::StaticRecords;
use ssrf_dns_core::UdpUpstream;
use ssrf_dns_core::DEFAULT_UPSTREAM_TIMEOUT;

// dig @127.0.0.1 -p 5353 a.rebind.localhost
#[tokio::main]
async fn main() -> Result<()> {
    let upstream = UdpUpstream::new(
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 53),
        DEFAULT_UPSTREAM_TIMEOUT,
    );
    let engine = RebindEngine::new(
        "rebind.localhost".to_string(),
        RebindAddrs::new(Ipv4Addr::new(93, 184, 216, 34), Ipv4Addr::LOCALHOST),
        StaticRecords::new(),
        upstream,
    );
    let listen_at = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 5353);
    let server = DNSServer::bind(listen_at, engine).await?;

    tokio::select! {
        res = server.serve() => {
            if let Err(err) = res {
                println!("error {:?}", err);
            }

        }
        _ = tokio::signal::ctrl_c() => {

        }
    }

    Ok(())
}
