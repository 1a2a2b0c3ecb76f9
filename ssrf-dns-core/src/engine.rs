use std::net::SocketAddr;

use tracing::debug;
use tracing::warn;
use trust_dns_proto::op::Message;
use trust_dns_proto::op::MessageType;
use trust_dns_proto::op::ResponseCode;
use trust_dns_proto::rr::RData;
use trust_dns_proto::rr::Record;
use trust_dns_proto::rr::RecordType;

use crate::audit::{AuditEvent, AuditSink, TracingAudit};
use crate::records::StaticRecords;
use crate::state::{RebindAddrs, RebindTracker};
use crate::upstream::Upstream;

/// TTL of rebind answers, every lookup has to reach the server again
pub const REBIND_TTL: u32 = 0;

/// How a request was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Raw upstream reply, to be written back untouched
    Proxied(Vec<u8>),
    /// Locally built reply
    Answered(Message),
}

/// Per-question routing: static records, then rebind answers for the target
/// domain, everything else goes upstream.
pub struct RebindEngine<U: Upstream, A: AuditSink = TracingAudit> {
    target_domain: String,
    addrs: RebindAddrs,
    records: StaticRecords,
    tracker: RebindTracker,
    upstream: U,
    audit: A,
}

impl<U: Upstream> RebindEngine<U> {
    /// Creates a new RebindEngine
    ///
    /// # Arguments
    ///
    /// * `target_domain` - suffix of the names that get rebind answers
    /// * `addrs` - first and subsequent answer addresses
    /// * `records` - static records, checked before anything else
    /// * `upstream` - where out-of-scope A queries are forwarded
    pub fn new(
        target_domain: String,
        addrs: RebindAddrs,
        records: StaticRecords,
        upstream: U,
    ) -> Self {
        Self {
            target_domain,
            addrs,
            records,
            tracker: RebindTracker::new(),
            upstream,
            audit: TracingAudit,
        }
    }
}

impl<U: Upstream, A: AuditSink> RebindEngine<U, A> {
    /// Replaces the audit sink.
    pub fn with_audit<B: AuditSink>(self, audit: B) -> RebindEngine<U, B> {
        RebindEngine {
            target_domain: self.target_domain,
            addrs: self.addrs,
            records: self.records,
            tracker: self.tracker,
            upstream: self.upstream,
            audit,
        }
    }

    pub fn records(&self) -> &StaticRecords {
        &self.records
    }

    pub fn tracker(&self) -> &RebindTracker {
        &self.tracker
    }

    /// Raw suffix test, `notevil.test` is in scope for `evil.test`.
    pub fn in_scope(&self, domain: &str) -> bool {
        domain.ends_with(self.target_domain.as_str())
    }

    /// Resolves every question of `request`.
    ///
    /// `raw` is the request exactly as received; it is what gets forwarded when
    /// a question is out of scope. The first successful forward ends the
    /// request, later questions are not looked at.
    pub async fn handle(&self, src: SocketAddr, raw: &[u8], request: &Message) -> Outcome {
        let mut answers: Vec<Record> = vec![];

        for query in request.queries() {
            let qname = query.name();
            let qtype = query.query_type();
            let domain = qname.to_ascii();
            let key = domain.strip_suffix('.').unwrap_or(&domain);

            // Step 1: static records
            let records = self.records.answers(qname, key, qtype);
            if !records.is_empty() {
                debug!("static answer for {} {}: {} records", domain, qtype, records.len());
                answers.extend(records);
                continue;
            }

            if qtype != RecordType::A {
                continue;
            }

            // Step 2: out of scope, hand the whole request upstream
            if !self.in_scope(key) {
                match self.upstream.exchange(raw).await {
                    Ok(reply) => {
                        self.audit.record(&AuditEvent::proxy(src, &domain));
                        return Outcome::Proxied(reply);
                    }
                    Err(err) => {
                        warn!(domain = %domain, cause = %err, "Proxy error");
                        continue;
                    }
                }
            }

            // Step 3: rebind
            let state = self.tracker.next_state(&domain);
            let ip = self.addrs.for_state(state);
            answers.push(Record::from_rdata(qname.clone(), REBIND_TTL, RData::A(ip)));
            self.audit.record(&AuditEvent::rebind(src, &domain, state, ip));
        }

        Outcome::Answered(build_response(request, answers))
    }
}

/// Authoritative reply echoing the question section of `request`.
pub fn build_response(request: &Message, answers: Vec<Record>) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_authoritative(true)
        .set_recursion_desired(request.recursion_desired())
        .set_checking_disabled(request.checking_disabled())
        .set_response_code(ResponseCode::NoError);
    response.add_queries(request.queries().to_vec());
    response.add_answers(answers);

    response
}
