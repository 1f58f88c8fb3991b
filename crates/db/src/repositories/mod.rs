use async_trait::async_trait;
use thiserror::Error;

use vendorgate_core::approvals::SectionChange;
use vendorgate_core::domain::vendor::{VendorApprovalRecord, VendorId};
use vendorgate_core::errors::PersistenceError;
use vendorgate_core::registry::ApprovalRegistry;

pub mod memory;
pub mod vendor_approval;

pub use memory::InMemoryVendorApprovalRepository;
pub use vendor_approval::SqlVendorApprovalRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for PersistenceError {
    fn from(value: RepositoryError) -> Self {
        PersistenceError(value.to_string())
    }
}

#[async_trait]
pub trait VendorApprovalRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &VendorId,
    ) -> Result<Option<VendorApprovalRecord>, RepositoryError>;

    /// All records in vendor id order.
    async fn list_all(&self) -> Result<Vec<VendorApprovalRecord>, RepositoryError>;

    /// Upserts the whole record; saving the same record twice is a no-op.
    async fn save(&self, record: &VendorApprovalRecord) -> Result<(), RepositoryError>;

    /// Appends a history entry; an entry whose change id is already stored is ignored.
    async fn append_change(&self, change: &SectionChange) -> Result<(), RepositoryError>;

    /// History for one vendor, oldest first.
    async fn list_changes(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Vec<SectionChange>, RepositoryError>;
}

/// Hydrates a registry with every stored record. History is not loaded.
pub async fn load_registry<R>(repository: &R) -> Result<ApprovalRegistry, RepositoryError>
where
    R: VendorApprovalRepository + ?Sized,
{
    let mut registry = ApprovalRegistry::default();
    for record in repository.list_all().await? {
        registry.upsert(record);
    }
    Ok(registry)
}

/// Hydrates a registry holding only `vendor_id` and its history; empty when the
/// vendor is unknown.
pub async fn load_vendor<R>(
    repository: &R,
    vendor_id: &VendorId,
) -> Result<ApprovalRegistry, RepositoryError>
where
    R: VendorApprovalRepository + ?Sized,
{
    let mut registry = ApprovalRegistry::default();
    let Some(record) = repository.find_by_id(vendor_id).await? else {
        return Ok(registry);
    };

    registry.upsert(record);
    for change in repository.list_changes(vendor_id).await? {
        registry.record_change(change);
    }
    Ok(registry)
}
