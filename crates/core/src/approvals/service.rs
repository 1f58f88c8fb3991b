use tracing::{error, info, warn};

use crate::approvals::persistence::ApprovalPersistence;
use crate::approvals::workflow::{overall_status, ApprovalWorkflow, SectionUpdate};
use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::section::ApprovalState;
use crate::domain::vendor::{VendorApprovalRecord, VendorId};
use crate::errors::WorkflowError;
use crate::registry::{ApprovalRegistry, ListFilter};

/// Reviewer-facing entry point: validates and applies a transition against
/// the registry, hands the result to persistence, and audits the outcome.
pub struct ReviewService<P, S> {
    workflow: ApprovalWorkflow,
    registry: ApprovalRegistry,
    persistence: P,
    audit: S,
}

impl<P, S> ReviewService<P, S>
where
    P: ApprovalPersistence,
    S: AuditSink,
{
    pub fn new(
        workflow: ApprovalWorkflow,
        registry: ApprovalRegistry,
        persistence: P,
        audit: S,
    ) -> Self {
        Self { workflow, registry, persistence, audit }
    }

    pub fn registry(&self) -> &ApprovalRegistry {
        &self.registry
    }

    pub fn list<'a>(
        &'a self,
        filter: &'a ListFilter,
    ) -> impl Iterator<Item = &'a VendorApprovalRecord> + 'a {
        self.registry.list(filter)
    }

    pub fn get(&self, vendor_id: &VendorId) -> Option<&VendorApprovalRecord> {
        self.registry.get(vendor_id)
    }

    pub fn overall_status(&self, record: &VendorApprovalRecord) -> ApprovalState {
        overall_status(record)
    }

    /// Used by the persistence side when replaying a previously applied result.
    pub fn replay(&mut self, record: VendorApprovalRecord) {
        self.registry.upsert(record);
    }

    /// Applies `update` on behalf of `context.actor`.
    ///
    /// On a validation error nothing changes. On a persistence error the
    /// in-memory registry already holds the new state but durability is not
    /// guaranteed; callers should re-fetch before assuming success.
    pub async fn set_section_status(
        &mut self,
        vendor_id: &VendorId,
        update: &SectionUpdate,
        context: &AuditContext,
    ) -> Result<VendorApprovalRecord, WorkflowError> {
        let outcome = match self.workflow.set_section_status(
            &mut self.registry,
            vendor_id,
            update,
            &context.actor,
        ) {
            Ok(outcome) => outcome,
            Err(rejection) => {
                warn!(
                    event_name = "review.section_update_rejected",
                    correlation_id = %context.correlation_id,
                    vendor_id = %vendor_id,
                    section = %update.section,
                    state = %update.state,
                    error_class = rejection.error_class(),
                    "section update rejected"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(vendor_id.clone()),
                        context,
                        "review.section_update_rejected",
                        AuditCategory::Review,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("section", update.section.clone())
                    .with_metadata("state", update.state.clone())
                    .with_metadata("error", rejection.to_string()),
                );
                return Err(rejection);
            }
        };

        if let Err(failure) = self.persistence.persist(&outcome.record, &outcome.change).await {
            error!(
                event_name = "review.persistence_failed",
                correlation_id = %context.correlation_id,
                vendor_id = %vendor_id,
                change_id = %outcome.change.change_id,
                error = %failure,
                "section update was applied but not persisted"
            );
            self.audit.emit(
                AuditEvent::new(
                    Some(vendor_id.clone()),
                    context,
                    "review.persistence_failed",
                    AuditCategory::Persistence,
                    AuditOutcome::Failed,
                )
                .with_metadata("change_id", outcome.change.change_id.clone())
                .with_metadata("error", failure.to_string()),
            );
            return Err(WorkflowError::from(failure));
        }

        let overall = overall_status(&outcome.record);
        info!(
            event_name = "review.section_updated",
            correlation_id = %context.correlation_id,
            vendor_id = %vendor_id,
            section = outcome.change.section.as_str(),
            from = outcome.change.previous.state.as_str(),
            to = outcome.change.current.state.as_str(),
            overall_status = overall.as_str(),
            "section status updated"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(vendor_id.clone()),
                context,
                "review.section_updated",
                AuditCategory::Review,
                AuditOutcome::Success,
            )
            .with_metadata("change_id", outcome.change.change_id.clone())
            .with_metadata("section", outcome.change.section.as_str())
            .with_metadata("from", outcome.change.previous.state.as_str())
            .with_metadata("to", outcome.change.current.state.as_str())
            .with_metadata("overall_status", overall.as_str()),
        );

        Ok(outcome.record)
    }
}
