use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use tokio::net::UdpSocket;
use trust_dns_proto::op::Message;

/// Largest datagram read from the upstream
pub const MAX_UDP_PACKET_SIZE: usize = 4096;

/// Default upstream exchange timeout
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(2);

/// Forwards a client request, byte for byte, to some other resolver.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync + 'static {
    /// Sends `request` as is and returns the raw reply.
    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>>;
}

/// UdpUpstream proxies requests to a single nameserver over UDP
#[derive(Debug, Clone)]
pub struct UdpUpstream {
    nameserver: SocketAddr,
    timeout: Duration,
}

impl UdpUpstream {
    pub fn new(nameserver: SocketAddr, timeout: Duration) -> Self {
        Self {
            nameserver,
            timeout,
        }
    }

    fn local_addr(&self) -> SocketAddr {
        let ip = match self.nameserver {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        SocketAddr::new(ip, 0)
    }
}

#[async_trait::async_trait]
impl Upstream for UdpUpstream {
    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>> {
        if request.len() < 2 {
            anyhow::bail!("request too short to carry a message id");
        }
        let id = u16::from_be_bytes([request[0], request[1]]);

        let socket = UdpSocket::bind(self.local_addr()).await?;
        socket
            .connect(self.nameserver)
            .await
            .with_context(|| format!("connect to upstream {}", self.nameserver))?;
        socket.send(request).await?;

        let mut buf = vec![0u8; MAX_UDP_PACKET_SIZE];
        let nread = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| {
                anyhow::format_err!(
                    "upstream {} timed out after {:?}",
                    self.nameserver,
                    self.timeout
                )
            })??;
        buf.truncate(nread);

        let reply = Message::from_vec(&buf).context("malformed upstream reply")?;
        if reply.id() != id {
            anyhow::bail!(
                "upstream reply id {} does not match request id {}",
                reply.id(),
                id
            );
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use trust_dns_proto::op::{MessageType, Query};
    use trust_dns_proto::rr::{Name, RecordType};

    use super::*;

    fn query_bytes(id: u16) -> Vec<u8> {
        let mut message = Message::new();
        message.set_id(id);
        message.add_query(Query::query(
            Name::from_ascii("other.test.").unwrap(),
            RecordType::A,
        ));
        message.to_vec().unwrap()
    }

    async fn fake_nameserver<F>(reply: F) -> SocketAddr
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_UDP_PACKET_SIZE];
            let (nread, from) = socket.recv_from(&mut buf).await.unwrap();
            let out = reply(&buf[..nread]);
            socket.send_to(&out, from).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_exchange_returns_reply_verbatim() {
        let nameserver = fake_nameserver(|req| {
            let mut reply = Message::from_vec(req).unwrap();
            reply.set_message_type(MessageType::Response);
            reply.to_vec().unwrap()
        })
        .await;
        let upstream = UdpUpstream::new(nameserver, DEFAULT_UPSTREAM_TIMEOUT);

        let request = query_bytes(4242);
        let reply = upstream.exchange(&request).await.unwrap();

        let message = Message::from_vec(&reply).unwrap();
        assert_eq!(message.id(), 4242);
        assert_eq!(message.message_type(), MessageType::Response);
    }

    #[tokio::test]
    async fn test_exchange_rejects_garbage() {
        let nameserver = fake_nameserver(|_| vec![0xde, 0xad]).await;
        let upstream = UdpUpstream::new(nameserver, DEFAULT_UPSTREAM_TIMEOUT);

        assert!(upstream.exchange(&query_bytes(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_exchange_rejects_id_mismatch() {
        let nameserver = fake_nameserver(|req| {
            let mut reply = Message::from_vec(req).unwrap();
            reply.set_id(reply.id().wrapping_add(1));
            reply.to_vec().unwrap()
        })
        .await;
        let upstream = UdpUpstream::new(nameserver, DEFAULT_UPSTREAM_TIMEOUT);

        assert!(upstream.exchange(&query_bytes(7)).await.is_err());
    }

    #[tokio::test]
    async fn test_exchange_timeout() {
        // bound but never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream = UdpUpstream::new(silent.local_addr().unwrap(), Duration::from_millis(50));

        let err = upstream.exchange(&query_bytes(9)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_send() {
        fn test<C: Send>() {}
        test::<UdpUpstream>();
    }

    #[test]
    fn test_sync() {
        fn test<C: Sync>() {}
        test::<UdpUpstream>();
    }
}
