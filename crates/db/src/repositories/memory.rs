use std::collections::BTreeMap;

use tokio::sync::RwLock;

use vendorgate_core::approvals::{ApprovalPersistence, SectionChange};
use vendorgate_core::domain::vendor::{VendorApprovalRecord, VendorId};
use vendorgate_core::errors::PersistenceError;

use super::{RepositoryError, VendorApprovalRepository};

#[derive(Default)]
pub struct InMemoryVendorApprovalRepository {
    records: RwLock<BTreeMap<VendorId, VendorApprovalRecord>>,
    changes: RwLock<Vec<SectionChange>>,
}

#[async_trait::async_trait]
impl VendorApprovalRepository for InMemoryVendorApprovalRepository {
    async fn find_by_id(
        &self,
        id: &VendorId,
    ) -> Result<Option<VendorApprovalRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<VendorApprovalRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }

    async fn save(&self, record: &VendorApprovalRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(record.vendor_id.clone(), record.clone());
        Ok(())
    }

    async fn append_change(&self, change: &SectionChange) -> Result<(), RepositoryError> {
        let mut changes = self.changes.write().await;
        if !changes.iter().any(|existing| existing.change_id == change.change_id) {
            changes.push(change.clone());
        }
        Ok(())
    }

    async fn list_changes(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Vec<SectionChange>, RepositoryError> {
        let changes = self.changes.read().await;
        Ok(changes.iter().filter(|change| &change.vendor_id == vendor_id).cloned().collect())
    }
}

#[async_trait::async_trait]
impl ApprovalPersistence for InMemoryVendorApprovalRepository {
    async fn persist(
        &self,
        record: &VendorApprovalRecord,
        change: &SectionChange,
    ) -> Result<(), PersistenceError> {
        {
            let mut records = self.records.write().await;
            match records.get_mut(&record.vendor_id) {
                Some(stored) => {
                    stored.sections.insert(change.section, change.current.clone());
                    stored.updated_at = stored.updated_at.max(record.updated_at);
                }
                None => {
                    records.insert(record.vendor_id.clone(), record.clone());
                }
            }
        }
        self.append_change(change).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use vendorgate_core::approvals::{ApprovalPersistence, ApprovalWorkflow, SectionUpdate};
    use vendorgate_core::domain::section::{ApprovalState, SectionName, WorkflowVariant};
    use vendorgate_core::domain::vendor::{
        AccountType, VendorApprovalRecord, VendorId, VendorProfile,
    };

    use crate::repositories::{InMemoryVendorApprovalRepository, VendorApprovalRepository};

    fn record(id: &str) -> VendorApprovalRecord {
        VendorApprovalRecord::new(
            VendorId(id.to_string()),
            AccountType::Individual,
            WorkflowVariant::LicenseReview,
            VendorProfile { display_name: "Kestrel Pharmacy".to_string(), ..Default::default() },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn memory_repository_roundtrip() {
        let repo = InMemoryVendorApprovalRepository::default();
        let record = record("V-10");

        repo.save(&record).await.expect("save");

        assert_eq!(repo.find_by_id(&record.vendor_id).await.expect("find"), Some(record));
        assert_eq!(repo.find_by_id(&VendorId("V-11".to_string())).await.expect("find"), None);
    }

    #[tokio::test]
    async fn persist_merges_sections_from_stale_snapshots() {
        let repo = InMemoryVendorApprovalRepository::default();
        let mut base = record("V-13");
        base.variant = WorkflowVariant::Onboarding;
        repo.save(&base).await.expect("save");
        let workflow = ApprovalWorkflow::default();

        let shop = workflow
            .apply(&base, &SectionUpdate::new("shop", "approved"), "admin:a")
            .expect("apply shop");
        let payment = workflow
            .apply(&base, &SectionUpdate::new("payment", "rejected"), "admin:b")
            .expect("apply payment");
        repo.persist(&shop.record, &shop.change).await.expect("persist shop");
        repo.persist(&payment.record, &payment.change).await.expect("persist payment");

        let stored = repo.find_by_id(&base.vendor_id).await.expect("find").expect("exists");
        assert_eq!(stored.section(SectionName::Shop).state, ApprovalState::Approved);
        assert_eq!(stored.section(SectionName::Payment).state, ApprovalState::Rejected);
    }

    #[tokio::test]
    async fn persist_twice_keeps_one_history_entry() {
        let repo = InMemoryVendorApprovalRepository::default();
        let record = record("V-12");
        let outcome = ApprovalWorkflow::default()
            .apply(&record, &SectionUpdate::new("business", "rejected"), "admin")
            .expect("apply");

        repo.persist(&outcome.record, &outcome.change).await.expect("persist");
        repo.persist(&outcome.record, &outcome.change).await.expect("retried persist");

        let stored = repo.find_by_id(&record.vendor_id).await.expect("find").expect("exists");
        assert_eq!(stored.section(SectionName::Business).state, ApprovalState::Rejected);
        assert_eq!(repo.list_changes(&record.vendor_id).await.expect("history").len(), 1);
        assert_eq!(repo.list_all().await.expect("list").len(), 1);
    }
}
