use serde::Deserialize;

use vendorgate_core::approvals::{overall_status, SectionChange};
use vendorgate_core::domain::section::{ApprovalState, SectionStatus};
use vendorgate_core::domain::vendor::{VendorApprovalRecord, VendorId};

use crate::connection::DbPool;
use crate::repositories::{RepositoryError, SqlVendorApprovalRepository, VendorApprovalRepository};

/// Expected shape of each demo vendor once seeded.
const SEED_VENDORS: &[SeedVendorContract] = &[
    SeedVendorContract {
        vendor_id: "V-1001",
        expected_overall: ApprovalState::Pending,
        reviewed_sections: 0,
        description: "Individual seller, nothing reviewed yet",
    },
    SeedVendorContract {
        vendor_id: "V-1002",
        expected_overall: ApprovalState::Approved,
        reviewed_sections: 5,
        description: "Company seller with every section approved",
    },
    SeedVendorContract {
        vendor_id: "V-1003",
        expected_overall: ApprovalState::Rejected,
        reviewed_sections: 3,
        description: "Company seller blocked on a rejected business section",
    },
    SeedVendorContract {
        vendor_id: "V-1004",
        expected_overall: ApprovalState::UnderReview,
        reviewed_sections: 1,
        description: "License review in progress",
    },
    SeedVendorContract {
        vendor_id: "V-1005",
        expected_overall: ApprovalState::Rejected,
        reviewed_sections: 2,
        description: "Individual seller with a rejected profile and missing documents",
    },
];

const SEED_REVIEWER: &str = "seed";

/// Deterministic demo vendors covering both account types, both workflow
/// variants, and every approval state.
pub struct DemoSeedDataset;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoFixture {
    dataset_version: String,
    vendors: Vec<VendorApprovalRecord>,
}

impl DemoSeedDataset {
    pub const JSON: &'static str = include_str!("../../../config/fixtures/demo_vendors.json");

    pub fn version() -> Result<String, RepositoryError> {
        Ok(parse_fixture()?.dataset_version)
    }

    pub fn records() -> Result<Vec<VendorApprovalRecord>, RepositoryError> {
        Ok(parse_fixture()?.vendors)
    }

    /// History entries explaining how each seeded section reached its state.
    pub fn changes(record: &VendorApprovalRecord) -> Vec<SectionChange> {
        record
            .sections
            .iter()
            .filter(|(_, status)| **status != SectionStatus::default())
            .map(|(section, status)| SectionChange {
                change_id: format!("seed-{}-{}", record.vendor_id, section),
                vendor_id: record.vendor_id.clone(),
                section: *section,
                previous: SectionStatus::default(),
                current: status.clone(),
                reviewer: SEED_REVIEWER.to_string(),
                changed_at: record.updated_at,
            })
            .collect()
    }

    /// Loads the demo vendors. Reloading resets them to their seeded state.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let repository = SqlVendorApprovalRepository::new(pool.clone());
        let mut vendors_seeded = Vec::new();

        for record in Self::records()? {
            repository.save(&record).await?;
            for change in Self::changes(&record) {
                repository.append_change(&change).await?;
            }

            let description = SEED_VENDORS
                .iter()
                .find(|contract| contract.vendor_id == record.vendor_id.0)
                .map(|contract| contract.description)
                .unwrap_or_default();
            vendors_seeded.push(VendorSeedInfo {
                vendor_id: record.vendor_id.0.clone(),
                overall_status: overall_status(&record),
                description,
            });
        }

        Ok(SeedResult { vendors_seeded })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let repository = SqlVendorApprovalRepository::new(pool.clone());
        let mut checks = Vec::new();

        for contract in SEED_VENDORS {
            let vendor_id = VendorId(contract.vendor_id.to_string());
            let record = repository.find_by_id(&vendor_id).await?;

            checks.push((format!("{}-exists", contract.vendor_id), record.is_some()));
            checks.push((
                format!("{}-overall-status", contract.vendor_id),
                record.as_ref().map(overall_status) == Some(contract.expected_overall),
            ));

            let history = repository.list_changes(&vendor_id).await?;
            let seeded = history.iter().filter(|change| change.reviewer == SEED_REVIEWER).count();
            checks.push((
                format!("{}-seeded-history", contract.vendor_id),
                seeded == contract.reviewed_sections,
            ));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

fn parse_fixture() -> Result<DemoFixture, RepositoryError> {
    serde_json::from_str(DemoSeedDataset::JSON)
        .map_err(|error| RepositoryError::Decode(format!("demo fixture: {error}")))
}

#[derive(Debug, Clone, Copy)]
struct SeedVendorContract {
    vendor_id: &'static str,
    expected_overall: ApprovalState,
    reviewed_sections: usize,
    description: &'static str,
}

#[derive(Debug)]
pub struct SeedResult {
    pub vendors_seeded: Vec<VendorSeedInfo>,
}

#[derive(Debug)]
pub struct VendorSeedInfo {
    pub vendor_id: String,
    pub overall_status: ApprovalState,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
