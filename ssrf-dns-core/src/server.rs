use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};
use trust_dns_proto::op::Message;
use trust_dns_proto::op::MessageType;

use crate::audit::{AuditSink, TracingAudit};
use crate::engine::{Outcome, RebindEngine};
use crate::upstream::{Upstream, MAX_UDP_PACKET_SIZE};

/// DNSServer answers DNS over UDP with a [`RebindEngine`].
///
/// Every datagram is handled on its own task, so a slow upstream only holds
/// up the query that is waiting for it.
pub struct DNSServer<U: Upstream, A: AuditSink = TracingAudit> {
    engine: Arc<RebindEngine<U, A>>,
    socket: UdpSocket,
}

impl<U: Upstream, A: AuditSink> DNSServer<U, A> {
    /// Binds a new DNSServer
    ///
    /// # Arguments
    ///
    /// * `listen_at` - DNS Server listening address
    /// * `engine` - decides the answer of every request
    pub async fn bind(listen_at: SocketAddr, engine: RebindEngine<U, A>) -> Result<Self> {
        let socket = UdpSocket::bind(listen_at)
            .await
            .with_context(|| format!("failed to bind udp socket at {}", listen_at))?;
        Ok(Self::from_socket(socket, engine))
    }

    /// Wraps an already bound socket
    pub fn from_socket(socket: UdpSocket, engine: RebindEngine<U, A>) -> Self {
        DNSServer {
            engine: Arc::new(engine),
            socket,
        }
    }

    pub fn listen_at(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn engine(&self) -> &Arc<RebindEngine<U, A>> {
        &self.engine
    }

    /// Receives forever; only returns on task cancellation.
    pub async fn serve(self) -> Result<()> {
        let socket = Arc::new(self.socket);
        let mut buf = vec![0u8; MAX_UDP_PACKET_SIZE];

        loop {
            let (nread, src) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(err) => {
                    warn!(cause = %err, "Failed to receive DNS query");
                    continue;
                }
            };

            let packet = buf[..nread].to_vec();
            let engine = self.engine.clone();
            let socket = socket.clone();
            tokio::spawn(async move {
                handle_datagram(engine, socket, src, packet).await;
            });
        }
    }
}

async fn handle_datagram<U: Upstream, A: AuditSink>(
    engine: Arc<RebindEngine<U, A>>,
    socket: Arc<UdpSocket>,
    src: SocketAddr,
    packet: Vec<u8>,
) {
    let request = match Message::from_vec(&packet) {
        Ok(request) => request,
        Err(err) => {
            debug!("Malformed DNS query from {}: {}", src, err);
            return;
        }
    };
    if request.message_type() != MessageType::Query {
        debug!("Ignoring DNS response from {}", src);
        return;
    }

    let out_buf = match engine.handle(src, &packet, &request).await {
        Outcome::Proxied(reply) => reply,
        Outcome::Answered(response) => match response.to_vec() {
            Ok(out_buf) => out_buf,
            Err(err) => {
                warn!("Failed to encode response to {}: {}", src, err);
                return;
            }
        },
    };

    match socket.send_to(&out_buf, src).await {
        Ok(nsent) if nsent == out_buf.len() => {
            trace!("Sent response to {}", src);
        }
        Ok(nsent) => {
            warn!(
                "Failed to send whole response, sent {}/{} bytes",
                nsent,
                out_buf.len()
            );
        }
        Err(err) => {
            warn!("Failed to send response to {}: {}", src, err);
        }
    }
}
