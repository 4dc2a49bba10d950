//! The aggregated, sectioned record set.

use std::collections::HashMap;

use crate::model::types::{Record, SearchPayload, SectionKey};

/// Records and paging state for one section.
#[derive(Debug, Clone, Default)]
pub struct SectionData {
    pub records: Vec<Record>,
    pub has_more: bool,
    pub page: u64,
}

/// The authoritative current result set, partitioned by section.
///
/// Only sections named in the caller-declared order are admitted; anything
/// else a server returns is dropped at ingest. Fresh results replace the
/// whole set; page advances merge into it.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    sections: HashMap<SectionKey, SectionData>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a fresh (non-paging) payload.
    pub fn replace(&mut self, payload: &SearchPayload, order: &[SectionKey]) {
        self.sections.clear();
        for key in order {
            if let Some(records) = payload.record.get(key.as_str()) {
                self.sections.insert(
                    key.clone(),
                    SectionData {
                        records: records.clone(),
                        has_more: payload.has_more_for(key.as_str()),
                        page: payload.page_for(key.as_str()).unwrap_or(1),
                    },
                );
            }
        }
    }

    /// Fold a page-advance payload into the set. Records append in server
    /// order with no dedup; pages advance only for the sections the
    /// response actually contains.
    pub fn merge(&mut self, payload: &SearchPayload, order: &[SectionKey]) {
        for key in order {
            let Some(records) = payload.record.get(key.as_str()) else {
                continue;
            };
            let section = self.sections.entry(key.clone()).or_default();
            section.records.extend(records.iter().cloned());
            section.has_more = payload.has_more_for(key.as_str());
            section.page = payload
                .page_for(key.as_str())
                .unwrap_or(section.page.max(1) + 1);
        }
    }

    pub fn section(&self, key: &SectionKey) -> Option<&SectionData> {
        self.sections.get(key)
    }

    /// Records for `key` in server order; empty when the section is
    /// unknown.
    pub fn records(&self, key: &SectionKey) -> &[Record] {
        self.sections
            .get(key)
            .map(|section| section.records.as_slice())
            .unwrap_or(&[])
    }

    /// Number of declared sections currently holding at least one record.
    pub fn populated_count(&self, order: &[SectionKey]) -> usize {
        order
            .iter()
            .filter(|key| !self.records(key).is_empty())
            .count()
    }

    /// Declared sections currently holding at least one record, in
    /// declared order.
    pub fn populated<'a>(&'a self, order: &'a [SectionKey]) -> impl Iterator<Item = &'a SectionKey> {
        order.iter().filter(|key| !self.records(key).is_empty())
    }

    /// The highest page counter across sections; 0 when empty.
    pub fn max_page(&self) -> u64 {
        self.sections
            .values()
            .map(|section| section.page)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }
}
