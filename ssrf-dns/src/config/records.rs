use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use ssrf_dns_core::{StaticRecord, StaticRecords};

/// A single `{type, value}` entry of the records file, a missing field reads as ""
///
/// `value` is read as a string straight off the scalar, so `1.10` stays "1.10".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecordConfig {
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub value: String,
}

/// A domain maps to either one record or a list of them
#[derive(Debug, Clone)]
struct RecordList(Vec<RecordConfig>);

impl From<RecordList> for Vec<RecordConfig> {
    fn from(list: RecordList) -> Self {
        list.0
    }
}

// Not `#[serde(untagged)]`: that buffers the entry first and the scalar text
// of `value` is lost.
impl<'de> Deserialize<'de> for RecordList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordListVisitor;

        impl<'de> Visitor<'de> for RecordListVisitor {
            type Value = RecordList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a {type, value} map or a list of them")
            }

            fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<RecordList, S::Error> {
                let mut records = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(record) = seq.next_element()? {
                    records.push(record);
                }
                Ok(RecordList(records))
            }

            fn visit_map<M: MapAccess<'de>>(self, map: M) -> Result<RecordList, M::Error> {
                let record =
                    RecordConfig::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(RecordList(vec![record]))
            }
        }

        deserializer.deserialize_any(RecordListVisitor)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecordsFile {
    #[serde(default)]
    record: Option<HashMap<String, RecordList>>,
}

impl From<RecordConfig> for StaticRecord {
    fn from(record: RecordConfig) -> Self {
        StaticRecord::new(&record.record_type, &record.value)
    }
}

/// Parses the YAML records document.
pub fn parse_static_records(content: &str) -> Result<StaticRecords> {
    if content.trim().is_empty() {
        return Ok(StaticRecords::new());
    }

    let file: RecordsFile = serde_yaml::from_str(content)?;
    Ok(file
        .record
        .unwrap_or_default()
        .into_iter()
        .map(|(domain, list)| {
            let records: Vec<RecordConfig> = list.into();
            (
                domain,
                records
                    .into_iter()
                    .map(StaticRecord::from)
                    .collect::<Vec<StaticRecord>>(),
            )
        })
        .collect())
}

/// Loads static records from `path`, no path means no records.
pub fn load_static_records<T: AsRef<Path>>(path: Option<T>) -> Result<StaticRecords> {
    let Some(path) = path else {
        return Ok(StaticRecords::new());
    };
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read records file {}", path.display()))?;
    parse_static_records(&content)
        .with_context(|| format!("failed to parse records file {}", path.display()))
}
