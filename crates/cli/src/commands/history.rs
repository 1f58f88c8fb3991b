use serde_json::json;

use crate::commands::{build_runtime, open_database, unknown_vendor, CommandResult, GlobalOptions};
use vendorgate_core::domain::vendor::VendorId;
use vendorgate_db::{SqlVendorApprovalRepository, VendorApprovalRepository};

pub fn run(options: &GlobalOptions, vendor_id: &str) -> CommandResult {
    let config = match options.load_config("history") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("history") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let id = VendorId(vendor_id.to_string());
    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let repository = SqlVendorApprovalRepository::new(pool.clone());
        let read_failure = |error: vendorgate_db::RepositoryError| {
            ("db_read", error.to_string(), 4u8)
        };

        let exists = repository.find_by_id(&id).await.map_err(read_failure)?.is_some();
        let changes = if exists {
            repository.list_changes(&id).await.map_err(read_failure)?
        } else {
            Vec::new()
        };
        pool.close().await;

        if exists {
            Ok(changes)
        } else {
            Err(unknown_vendor(vendor_id))
        }
    });

    match result {
        Ok(changes) => {
            let message = format!("{} transitions recorded for {}", changes.len(), id);
            CommandResult::success_with_data(
                "history",
                message,
                Some(json!({ "vendorId": id, "changes": changes })),
            )
        }
        Err(failure) => CommandResult::from_failure("history", failure),
    }
}
