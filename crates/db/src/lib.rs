pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{DemoSeedDataset, SeedResult, VendorSeedInfo, VerificationResult};
pub use repositories::{
    load_registry, load_vendor, InMemoryVendorApprovalRepository, RepositoryError,
    SqlVendorApprovalRepository, VendorApprovalRepository,
};
