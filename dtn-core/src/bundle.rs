//! In-memory bundle model as seen by the core. Wire encoding lives elsewhere.

use crate::eid::Eid;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Tag recording the link-local identifier of the channel a bundle arrived on.
pub const CLA_ORIGIN_TAG: &str = "cla-origin-iid";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId(String);

impl BundleId {
    pub fn generate() -> Self {
        BundleId(Uuid::new_v4().hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BundleId {
    fn from(value: &str) -> Self {
        BundleId(value.to_string())
    }
}

impl From<String> for BundleId {
    fn from(value: String) -> Self {
        BundleId(value)
    }
}

impl Display for BundleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub bid: BundleId,
    pub source: Eid,
    pub destination: Eid,
    pub report_to: Eid,
    pub payload: Vec<u8>,
    tags: HashMap<String, String>,
}

impl Bundle {
    /// Creates a bundle with a fresh id; report-to defaults to the source.
    pub fn new(source: Eid, destination: Eid, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            bid: BundleId::generate(),
            report_to: source.clone(),
            source,
            destination,
            payload: payload.into(),
            tags: HashMap::new(),
        }
    }

    pub fn with_report_to(mut self, report_to: Eid) -> Self {
        self.report_to = report_to;
        self
    }

    pub fn with_bid(mut self, bid: BundleId) -> Self {
        self.bid = bid;
        self
    }

    /// Attaches processing metadata; tags never reach the wire.
    pub fn tag(&mut self, key: &str, value: impl Into<String>) {
        self.tags.insert(key.to_string(), value.into());
    }

    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
