use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::approvals::workflow::{overall_status, SectionChange};
use crate::domain::section::{ApprovalState, SectionName};
use crate::domain::vendor::{DocumentCompleteness, VendorApprovalRecord, VendorId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStateFilter {
    pub section: SectionName,
    pub state: ApprovalState,
}

/// Options accepted by [`ApprovalRegistry::list`]. Unset options match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub search_text: Option<String>,
    pub section_status: Option<SectionStateFilter>,
    pub document_completeness: Option<DocumentCompleteness>,
    pub overall_status: Option<ApprovalState>,
}

impl ListFilter {
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn section_state(mut self, section: SectionName, state: ApprovalState) -> Self {
        self.section_status = Some(SectionStateFilter { section, state });
        self
    }

    pub fn documents(mut self, completeness: DocumentCompleteness) -> Self {
        self.document_completeness = Some(completeness);
        self
    }

    pub fn overall(mut self, state: ApprovalState) -> Self {
        self.overall_status = Some(state);
        self
    }

    pub fn matches(&self, record: &VendorApprovalRecord) -> bool {
        if let Some(text) = self.search_text.as_deref().map(str::trim) {
            if !text.is_empty() && !record.matches_search(text) {
                return false;
            }
        }

        // A section outside the record's variant never matches.
        if let Some(filter) = &self.section_status {
            if !record.variant.includes(filter.section)
                || record.section(filter.section).state != filter.state
            {
                return false;
            }
        }

        if let Some(completeness) = self.document_completeness {
            if record.document_completeness != completeness {
                return false;
            }
        }

        if let Some(state) = self.overall_status {
            if overall_status(record) != state {
                return false;
            }
        }

        true
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub under_review: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.under_review + self.approved + self.rejected
    }

    fn bump(&mut self, state: ApprovalState) {
        match state {
            ApprovalState::Pending => self.pending += 1,
            ApprovalState::UnderReview => self.under_review += 1,
            ApprovalState::Approved => self.approved += 1,
            ApprovalState::Rejected => self.rejected += 1,
        }
    }
}

/// Vendor approval records keyed by vendor id, plus per-vendor transition history.
///
/// Iteration follows vendor id order, which keeps `list` stable for a given
/// snapshot of the registry.
#[derive(Clone, Debug, Default)]
pub struct ApprovalRegistry {
    records: BTreeMap<VendorId, VendorApprovalRecord>,
    history: BTreeMap<VendorId, Vec<SectionChange>>,
}

impl ApprovalRegistry {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = VendorApprovalRecord>,
    {
        let records =
            records.into_iter().map(|record| (record.vendor_id.clone(), record)).collect();
        Self { records, history: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records matching `filter`. Each call starts over from the current contents.
    pub fn list<'a>(
        &'a self,
        filter: &'a ListFilter,
    ) -> impl Iterator<Item = &'a VendorApprovalRecord> + 'a {
        self.records.values().filter(move |record| filter.matches(record))
    }

    pub fn get(&self, vendor_id: &VendorId) -> Option<&VendorApprovalRecord> {
        self.records.get(vendor_id)
    }

    /// Stores `record` as-is, replacing any previous version. Returns the replaced record.
    pub fn upsert(&mut self, record: VendorApprovalRecord) -> Option<VendorApprovalRecord> {
        self.records.insert(record.vendor_id.clone(), record)
    }

    /// Appends a history entry. Replaying an entry already present is a no-op.
    pub fn record_change(&mut self, change: SectionChange) {
        let entries = self.history.entry(change.vendor_id.clone()).or_default();
        if entries.iter().any(|existing| existing.change_id == change.change_id) {
            return;
        }
        entries.push(change);
    }

    pub fn history(&self, vendor_id: &VendorId) -> &[SectionChange] {
        self.history.get(vendor_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn status_counts(&self) -> StatusCounts {
        self.records.values().fold(StatusCounts::default(), |mut counts, record| {
            counts.bump(overall_status(record));
            counts
        })
    }
}
