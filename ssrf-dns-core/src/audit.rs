use std::fmt;
use std::net::Ipv4Addr;
use std::net::SocketAddr;

use tracing::info;

use crate::state::RebindState;

/// What the server did with a question.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum AuditAction {
    /// whole request forwarded upstream
    Proxy,
    /// rebind answer with the first-response address
    New,
    /// rebind answer with the subsequent-response address
    Returning,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Proxy => "PROXY",
            AuditAction::New => "NEW",
            AuditAction::Returning => "RETURNING",
        }
    }
}

impl From<RebindState> for AuditAction {
    fn from(state: RebindState) -> Self {
        match state {
            RebindState::New => AuditAction::New,
            RebindState::Returning => AuditAction::Returning,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One routing decision, as it ends up in the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub src: SocketAddr,
    pub domain: String,
    pub action: AuditAction,
    pub resp: Option<Ipv4Addr>,
}

impl AuditEvent {
    pub fn proxy(src: SocketAddr, domain: &str) -> Self {
        Self {
            src,
            domain: domain.to_string(),
            action: AuditAction::Proxy,
            resp: None,
        }
    }

    pub fn rebind(src: SocketAddr, domain: &str, state: RebindState, resp: Ipv4Addr) -> Self {
        Self {
            src,
            domain: domain.to_string(),
            action: state.into(),
            resp: Some(resp),
        }
    }

    /// Client address as logged: `ip:port` for PROXY, the bare IP otherwise.
    pub fn remote(&self) -> String {
        match self.action {
            AuditAction::Proxy => self.src.to_string(),
            _ => self.src.ip().to_string(),
        }
    }
}

/// Receives audit events. Must not block and must not fail the request.
pub trait AuditSink: Send + Sync + 'static {
    fn record(&self, event: &AuditEvent);
}

/// Writes audit events through `tracing` on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, event: &AuditEvent) {
        match event.resp {
            Some(resp) => info!(
                target: "audit",
                src = %event.remote(),
                domain = %event.domain,
                resp = %resp,
                action = %event.action,
                "rebind answer"
            ),
            None => info!(
                target: "audit",
                src = %event.remote(),
                domain = %event.domain,
                action = %event.action,
                "forwarded upstream"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebind_event() {
        let src: SocketAddr = "192.168.0.7:40000".parse().unwrap();
        let event = AuditEvent::rebind(
            src,
            "a.evil.test.",
            RebindState::Returning,
            Ipv4Addr::new(10, 0, 0, 5),
        );

        assert_eq!(event.action, AuditAction::Returning);
        assert_eq!(event.resp, Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(event.action.to_string(), "RETURNING");
        assert_eq!(event.remote(), "192.168.0.7");
    }

    #[test]
    fn test_proxy_event() {
        let src: SocketAddr = "127.0.0.1:53535".parse().unwrap();
        let event = AuditEvent::proxy(src, "other.test.");

        assert_eq!(event.action, AuditAction::Proxy);
        assert_eq!(event.resp, None);
        assert_eq!(event.remote(), "127.0.0.1:53535");

        // no subscriber installed, must be a no-op
        TracingAudit.record(&event);
    }
}
