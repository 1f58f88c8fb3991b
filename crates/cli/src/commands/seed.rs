use serde_json::json;

use crate::commands::{
    build_runtime, open_migrated_database, CommandResult, Failure, GlobalOptions,
};
use vendorgate_db::{DemoSeedDataset, VendorSeedInfo};

pub fn run(options: &GlobalOptions) -> CommandResult {
    let config = match options.load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_database(&config).await?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;

        if !verification.all_present {
            let failed = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
                .collect::<Vec<_>>();
            return Err(("seed_verification", verification_message(&failed), 6u8));
        }

        Ok::<_, Failure>(seed_result.vendors_seeded)
    });

    match result {
        Ok(vendors) => {
            let lines = vendors.iter().map(describe).collect::<Vec<_>>();
            let message =
                format!("demo vendors loaded ({}):\n{}", vendors.len(), lines.join("\n"));
            let data = vendors
                .iter()
                .map(|vendor| {
                    json!({
                        "vendorId": vendor.vendor_id,
                        "overallStatus": vendor.overall_status,
                        "description": vendor.description,
                    })
                })
                .collect::<Vec<_>>();
            CommandResult::success_with_data("seed", message, Some(json!({ "vendors": data })))
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn describe(vendor: &VendorSeedInfo) -> String {
    format!("  - {} [{}]: {}", vendor.vendor_id, vendor.overall_status, vendor.description)
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
