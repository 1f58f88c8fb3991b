use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::section::{ApprovalState, SectionName, SectionStatus};
use crate::domain::vendor::{VendorApprovalRecord, VendorId};
use crate::errors::WorkflowError;
use crate::registry::ApprovalRegistry;

pub const DEFAULT_MAX_NOTE_LENGTH: usize = 2000;

/// A reviewer's requested transition, still in its raw form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionUpdate {
    pub section: String,
    pub state: String,
    pub note: Option<String>,
}

impl SectionUpdate {
    pub fn new(section: impl Into<String>, state: impl Into<String>) -> Self {
        Self { section: section.into(), state: state.into(), note: None }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// History entry produced by every applied transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChange {
    pub change_id: String,
    pub vendor_id: VendorId,
    pub section: SectionName,
    pub previous: SectionStatus,
    pub current: SectionStatus,
    pub reviewer: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub record: VendorApprovalRecord,
    pub change: SectionChange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ValidatedUpdate {
    section: SectionName,
    state: ApprovalState,
}

#[derive(Clone, Debug)]
pub struct ApprovalWorkflow {
    max_note_length: usize,
}

impl Default for ApprovalWorkflow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NOTE_LENGTH)
    }
}

impl ApprovalWorkflow {
    pub fn new(max_note_length: usize) -> Self {
        Self { max_note_length }
    }

    pub fn max_note_length(&self) -> usize {
        self.max_note_length
    }

    /// Applies `update` to `record`, returning the updated copy.
    ///
    /// Any state may move to any other state, itself included. Validation
    /// happens before anything is built, so `record` is never touched.
    pub fn apply(
        &self,
        record: &VendorApprovalRecord,
        update: &SectionUpdate,
        reviewer: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.apply_at(record, update, reviewer, Utc::now())
    }

    pub fn apply_at(
        &self,
        record: &VendorApprovalRecord,
        update: &SectionUpdate,
        reviewer: &str,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let validated = self.validate(record, update)?;
        let note = normalize_note(update.note.as_deref());
        if let Some(note) = &note {
            let length = note.chars().count();
            if length > self.max_note_length {
                return Err(WorkflowError::InvalidNote {
                    length,
                    max_length: self.max_note_length,
                });
            }
        }

        let previous = record.section(validated.section);
        let current = SectionStatus::new(validated.state, note);

        let mut updated = record.clone();
        updated.sections.insert(validated.section, current.clone());
        updated.updated_at = at;

        debug!(
            event_name = "review.section_transition_applied",
            vendor_id = %record.vendor_id,
            section = validated.section.as_str(),
            from = previous.state.as_str(),
            to = current.state.as_str(),
            "section transition applied"
        );

        let change = SectionChange {
            change_id: Uuid::new_v4().to_string(),
            vendor_id: record.vendor_id.clone(),
            section: validated.section,
            previous,
            current,
            reviewer: reviewer.to_string(),
            changed_at: at,
        };

        Ok(TransitionOutcome { record: updated, change })
    }

    /// Looks the vendor up in `registry`, applies `update`, and stores the
    /// result and its history entry back into the registry.
    pub fn set_section_status(
        &self,
        registry: &mut ApprovalRegistry,
        vendor_id: &VendorId,
        update: &SectionUpdate,
        reviewer: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.set_section_status_at(registry, vendor_id, update, reviewer, Utc::now())
    }

    pub fn set_section_status_at(
        &self,
        registry: &mut ApprovalRegistry,
        vendor_id: &VendorId,
        update: &SectionUpdate,
        reviewer: &str,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let record = registry
            .get(vendor_id)
            .ok_or_else(|| WorkflowError::UnknownVendor { vendor_id: vendor_id.clone() })?;

        let outcome = self.apply_at(record, update, reviewer, at)?;
        registry.upsert(outcome.record.clone());
        registry.record_change(outcome.change.clone());
        Ok(outcome)
    }

    pub fn overall_status(&self, record: &VendorApprovalRecord) -> ApprovalState {
        overall_status(record)
    }

    fn validate(
        &self,
        record: &VendorApprovalRecord,
        update: &SectionUpdate,
    ) -> Result<ValidatedUpdate, WorkflowError> {
        let unknown_section = || WorkflowError::UnknownSection {
            section: update.section.clone(),
            variant: record.variant,
        };

        let section = update.section.parse::<SectionName>().map_err(|_| unknown_section())?;
        if !record.variant.includes(section) {
            return Err(unknown_section());
        }

        let state = update
            .state
            .parse::<ApprovalState>()
            .map_err(|_| WorkflowError::InvalidState { state: update.state.clone() })?;

        Ok(ValidatedUpdate { section, state })
    }
}

/// Aggregate standing across the record's sections.
///
/// Precedence is rejected > approved (only when every section is) >
/// under_review > pending, so one rejection is never masked.
pub fn overall_status(record: &VendorApprovalRecord) -> ApprovalState {
    let states =
        record.section_statuses().into_iter().map(|(_, status)| status.state).collect::<Vec<_>>();

    if states.contains(&ApprovalState::Rejected) {
        ApprovalState::Rejected
    } else if !states.is_empty() && states.iter().all(|state| *state == ApprovalState::Approved) {
        ApprovalState::Approved
    } else if states.contains(&ApprovalState::UnderReview) {
        ApprovalState::UnderReview
    } else {
        ApprovalState::Pending
    }
}

fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim).filter(|note| !note.is_empty()).map(str::to_string)
}
