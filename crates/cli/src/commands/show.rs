use std::collections::BTreeMap;

use serde_json::json;

use crate::commands::{build_runtime, open_database, unknown_vendor, CommandResult, GlobalOptions};
use vendorgate_core::approvals::overall_status;
use vendorgate_core::domain::vendor::VendorId;
use vendorgate_db::{SqlVendorApprovalRepository, VendorApprovalRepository};

pub fn run(options: &GlobalOptions, vendor_id: &str) -> CommandResult {
    let config = match options.load_config("show") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("show") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let repository = SqlVendorApprovalRepository::new(pool.clone());
        let record = repository
            .find_by_id(&VendorId(vendor_id.to_string()))
            .await
            .map_err(|error| ("db_read", error.to_string(), 4u8))?;
        pool.close().await;
        record.ok_or_else(|| unknown_vendor(vendor_id))
    });

    let record = match result {
        Ok(record) => record,
        Err(failure) => return CommandResult::from_failure("show", failure),
    };

    let overall = overall_status(&record);
    let message = format!("{} ({}) is {}", record.vendor_id, record.review_label(), overall);
    let data = json!({
        "overallStatus": overall,
        "reviewLabel": record.review_label(),
        "sectionStatuses": record.section_statuses().into_iter().collect::<BTreeMap<_, _>>(),
        "record": record,
    });

    CommandResult::success_with_data("show", message, Some(data))
}
