use async_trait::async_trait;

use crate::approvals::workflow::SectionChange;
use crate::domain::vendor::VendorApprovalRecord;
use crate::errors::PersistenceError;

/// Durable storage for applied transitions.
///
/// Implementations must tolerate the same `(record, change)` pair being
/// persisted more than once, since callers retry by re-issuing the update.
#[async_trait]
pub trait ApprovalPersistence: Send + Sync {
    async fn persist(
        &self,
        record: &VendorApprovalRecord,
        change: &SectionChange,
    ) -> Result<(), PersistenceError>;
}
