//! Metadata captured alongside every emitted event
//!
//! Emission contexts stamp the origin package as correlation id and the
//! emitted package as a label, so the events of one configuration can be
//! grouped even when its subpackages are emitted concurrently.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label key naming the package an event belongs to
pub const PACKAGE_LABEL: &str = "package";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub event_id: Uuid,
    /// Origin package of the configuration being emitted
    pub correlation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub source: EventSource,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl EventMeta {
    #[must_use]
    pub fn new(level: EventLevel, source: EventSource) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            correlation_id: None,
            timestamp: Utc::now(),
            level,
            source,
            labels: BTreeMap::new(),
        }
    }

    /// Package the event concerns, if an emission context tagged it
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.labels.get(PACKAGE_LABEL).map(String::as_str)
    }

    pub fn set_package(&mut self, package: impl Into<String>) {
        self.labels.insert(PACKAGE_LABEL.to_string(), package.into());
    }
}

/// Severity of an event
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Subsystem an event came from
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    General,
    Package,
}

impl EventSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Package => "package",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_label() {
        let mut meta = EventMeta::new(EventLevel::Info, EventSource::Package);
        assert_eq!(meta.package(), None);

        meta.set_package("libcrypto3");
        assert_eq!(meta.package(), Some("libcrypto3"));

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["labels"]["package"], "libcrypto3");
        assert_eq!(json["source"], "package");
        assert_eq!(json["level"], "info");
    }
}
