use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use anyhow::Result;
use tracing::warn;
use trust_dns_proto::rr::rdata::TXT;
use trust_dns_proto::rr::Name;
use trust_dns_proto::rr::RData;
use trust_dns_proto::rr::Record;
use trust_dns_proto::rr::RecordType;

/// TTL of every answer built from a static record
pub const STATIC_RECORD_TTL: u32 = 300;

/// A single operator-configured record, kept as written in the record file.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StaticRecord {
    pub record_type: String,
    pub value: String,
}

impl StaticRecord {
    pub fn new(record_type: &str, value: &str) -> StaticRecord {
        StaticRecord {
            record_type: record_type.into(),
            value: value.into(),
        }
    }

    /// The query type this entry answers, `None` for type strings we don't serve.
    pub fn query_type(&self) -> Option<RecordType> {
        match self.record_type.as_str() {
            "A" => Some(RecordType::A),
            "TXT" => Some(RecordType::TXT),
            "CNAME" => Some(RecordType::CNAME),
            _ => None,
        }
    }

    /// Builds the answer record owned by `owner`.
    ///
    /// Returns `None` when the value can't be represented by its type, e.g. an
    /// A record whose value is not an IPv4 literal. The caller keeps going with
    /// the remaining entries.
    pub fn to_record(&self, owner: &Name) -> Option<Record> {
        let rdata = match self.query_type()? {
            RecordType::A => match Ipv4Addr::from_str(&self.value) {
                Ok(ip) => RData::A(ip),
                Err(_) => {
                    warn!(domain = %owner, value = %self.value, "Error parsing static A record IP");
                    return None;
                }
            },
            RecordType::TXT => RData::TXT(TXT::new(vec![self.value.clone()])),
            RecordType::CNAME => match fqdn(&self.value) {
                Ok(target) => RData::CNAME(target),
                Err(err) => {
                    warn!(domain = %owner, value = %self.value, cause = %err, "Error parsing static CNAME target");
                    return None;
                }
            },
            _ => return None,
        };

        Some(Record::from_rdata(owner.clone(), STATIC_RECORD_TTL, rdata))
    }
}

impl fmt::Display for StaticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.record_type, self.value)
    }
}

/// Parses `value` as a fully-qualified name, adding the trailing dot if needed.
pub fn fqdn(value: &str) -> Result<Name> {
    let mut name = value.to_string();
    if !name.ends_with('.') {
        name.push('.');
    }
    Ok(Name::from_utf8(name)?)
}

/// Static record table, keyed by domain without the trailing dot.
///
/// Built once at startup and only read afterwards.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct StaticRecords {
    records: HashMap<String, Vec<StaticRecord>>,
}

impl StaticRecords {
    /// Create empty StaticRecords
    pub fn new() -> StaticRecords {
        StaticRecords {
            records: HashMap::new(),
        }
    }

    /// Appends `records` to the entries of `domain`, keeping their order.
    pub fn insert<D: Into<String>>(&mut self, domain: D, records: Vec<StaticRecord>) {
        self.records
            .entry(domain.into())
            .or_default()
            .extend(records);
    }

    /// Number of configured domains
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Entries of `domain` answering `qtype`, in configuration order.
    pub fn lookup(&self, domain: &str, qtype: RecordType) -> Vec<&StaticRecord> {
        match self.records.get(domain) {
            Some(records) => records
                .iter()
                .filter(|record| record.query_type() == Some(qtype))
                .collect(),
            None => vec![],
        }
    }

    /// Answers for a question named `qname`, looked up under `domain`.
    pub fn answers(&self, qname: &Name, domain: &str, qtype: RecordType) -> Vec<Record> {
        self.lookup(domain, qtype)
            .into_iter()
            .filter_map(|record| record.to_record(qname))
            .collect()
    }
}

impl FromIterator<(String, Vec<StaticRecord>)> for StaticRecords {
    fn from_iter<I: IntoIterator<Item = (String, Vec<StaticRecord>)>>(iter: I) -> Self {
        let mut table = StaticRecords::new();
        for (domain, records) in iter {
            table.insert(domain, records);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StaticRecords {
        StaticRecords::from_iter(vec![
            (
                "multi.evil.test".to_string(),
                vec![
                    StaticRecord::new("A", "1.1.1.1"),
                    StaticRecord::new("TXT", "hello"),
                    StaticRecord::new("A", "not-an-ip"),
                    StaticRecord::new("A", "2.2.2.2"),
                    StaticRecord::new("CNAME", "target.example.com"),
                ],
            ),
            (
                "weird.evil.test".to_string(),
                vec![StaticRecord::new("MX", "mail.example.com")],
            ),
        ])
    }

    #[test]
    fn test_lookup_filters_by_type() {
        let table = table();

        let a: Vec<&str> = table
            .lookup("multi.evil.test", RecordType::A)
            .iter()
            .map(|r| r.value.as_str())
            .collect();
        assert_eq!(a, vec!["1.1.1.1", "not-an-ip", "2.2.2.2"]);

        assert_eq!(table.lookup("multi.evil.test", RecordType::TXT).len(), 1);
        assert!(table.lookup("multi.evil.test", RecordType::AAAA).is_empty());
        assert!(table.lookup("multi.evil.test.", RecordType::A).is_empty());
        assert!(table.lookup("missing.evil.test", RecordType::A).is_empty());
    }

    #[test]
    fn test_unknown_type_never_matches() {
        let table = table();
        assert!(table.lookup("weird.evil.test", RecordType::MX).is_empty());
        assert_eq!(StaticRecord::new("a", "1.1.1.1").query_type(), None);
    }

    #[test]
    fn test_answers_skip_invalid_a() {
        let table = table();
        let qname = Name::from_ascii("multi.evil.test.").unwrap();

        let answers = table.answers(&qname, "multi.evil.test", RecordType::A);

        assert_eq!(answers.len(), 2);
        assert_eq!(
            answers[0].data(),
            Some(&RData::A(Ipv4Addr::new(1, 1, 1, 1)))
        );
        assert_eq!(
            answers[1].data(),
            Some(&RData::A(Ipv4Addr::new(2, 2, 2, 2)))
        );
        for answer in answers {
            assert_eq!(answer.ttl(), STATIC_RECORD_TTL);
            assert_eq!(answer.name(), &qname);
        }
    }

    #[test]
    fn test_cname_target_is_fully_qualified() {
        let qname = Name::from_ascii("multi.evil.test.").unwrap();
        let record = StaticRecord::new("CNAME", "target.example.com")
            .to_record(&qname)
            .unwrap();

        match record.data() {
            Some(RData::CNAME(target)) => {
                assert!(target.is_fqdn());
                assert_eq!(target.to_ascii(), "target.example.com.");
            }
            other => panic!("unexpected rdata {:?}", other),
        }
    }

    #[test]
    fn test_txt_value() {
        let qname = Name::from_ascii("multi.evil.test.").unwrap();
        let record = StaticRecord::new("TXT", "hello").to_record(&qname).unwrap();

        assert_eq!(record.record_type(), RecordType::TXT);
        assert_eq!(
            record.data(),
            Some(&RData::TXT(TXT::new(vec!["hello".to_string()])))
        );
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut table = StaticRecords::new();
        table.insert("a.test", vec![StaticRecord::new("TXT", "one")]);
        table.insert("a.test", vec![StaticRecord::new("TXT", "two")]);

        let values: Vec<String> = table
            .lookup("a.test", RecordType::TXT)
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(values, vec!["TXT one", "TXT two"]);
        assert_eq!(table.len(), 1);
    }
}
