use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fields;

/// One document as stored in the search index. All values are kept as
/// strings; multi-valued fields keep their index order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexRecord {
    fields: BTreeMap<String, Vec<String>>,
}

impl IndexRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: &str, value: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(value.into());
    }

    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.values(field).first().map(String::as_str)
    }

    /// Distinct values of `field`, in first-seen order.
    pub fn distinct_values(&self, field: &str) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for value in self.values(field) {
            if !seen.contains(&value.as_str()) {
                seen.push(value);
            }
        }
        seen
    }

    pub fn identifier(&self) -> Option<&str> {
        self.first(fields::PI)
    }

    pub fn is_deleted(&self) -> bool {
        !self.values(fields::DATE_DELETED).is_empty()
    }

    /// Datestamp in millis: the deletion time for tombstones, otherwise the
    /// latest update time.
    pub fn datestamp_millis(&self) -> Option<i64> {
        let field = if self.is_deleted() {
            fields::DATE_DELETED
        } else {
            fields::DATE_UPDATED
        };
        self.values(field)
            .iter()
            .filter_map(|v| v.trim().parse::<i64>().ok())
            .max()
    }
}

/// One item as delivered to the client and handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualItem {
    pub record: IndexRecord,
    /// Discriminator value for expanded formats.
    pub variant: Option<String>,
}

impl VirtualItem {
    pub fn identifier(&self) -> Option<&str> {
        self.record.identifier()
    }

    pub fn is_deleted(&self) -> bool {
        self.record.is_deleted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_values_keep_first_seen_order() {
        let record = IndexRecord::new()
            .with("LANGUAGE", "de")
            .with("LANGUAGE", "en")
            .with("LANGUAGE", "de")
            .with("LANGUAGE", "fr");
        assert_eq!(record.distinct_values("LANGUAGE"), vec!["de", "en", "fr"]);
        assert!(record.distinct_values("MISSING").is_empty());
    }

    #[test]
    fn tombstone_datestamp_uses_deletion_time() {
        let live = IndexRecord::new()
            .with(fields::PI, "PPN1")
            .with(fields::DATE_UPDATED, "100")
            .with(fields::DATE_UPDATED, "300");
        assert!(!live.is_deleted());
        assert_eq!(live.datestamp_millis(), Some(300));

        let gone = live.clone().with(fields::DATE_DELETED, "500");
        assert!(gone.is_deleted());
        assert_eq!(gone.datestamp_millis(), Some(500));
    }
}
