use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use crate::commands::{build_runtime, open_database, CommandResult, Failure, GlobalOptions};
use vendorgate_core::approvals::overall_status;
use vendorgate_core::domain::section::{ApprovalState, SectionName, SectionStatus};
use vendorgate_core::domain::vendor::{DocumentCompleteness, VendorApprovalRecord};
use vendorgate_core::registry::ListFilter;
use vendorgate_db::{load_registry, SqlVendorApprovalRepository};

/// Raw `list` flags; parsed into a [`ListFilter`] before touching the database.
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub search: Option<String>,
    pub section: Option<String>,
    pub state: Option<String>,
    pub documents: Option<String>,
    pub overall: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VendorSummary<'a> {
    vendor_id: &'a str,
    review_label: &'a str,
    account_type: &'a str,
    variant: &'a str,
    document_completeness: DocumentCompleteness,
    overall_status: ApprovalState,
    sections: BTreeMap<SectionName, SectionStatus>,
    updated_at: String,
}

impl<'a> VendorSummary<'a> {
    fn from_record(record: &'a VendorApprovalRecord) -> Self {
        Self {
            vendor_id: &record.vendor_id.0,
            review_label: record.review_label(),
            account_type: record.account_type.as_str(),
            variant: record.variant.as_str(),
            document_completeness: record.document_completeness,
            overall_status: overall_status(record),
            sections: record.section_statuses().into_iter().collect(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

pub fn run(options: &GlobalOptions, args: &ListArgs) -> CommandResult {
    let filter = match build_filter(args) {
        Ok(filter) => filter,
        Err(message) => return CommandResult::failure("list", "invalid_filter", message, 7),
    };

    let config = match options.load_config("list") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("list") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let repository = SqlVendorApprovalRepository::new(pool.clone());
        let registry = load_registry(&repository)
            .await
            .map_err(|error| ("db_read", error.to_string(), 4u8))?;
        pool.close().await;
        Ok::<_, Failure>(registry)
    });

    let registry = match result {
        Ok(registry) => registry,
        Err(failure) => return CommandResult::from_failure("list", failure),
    };

    let vendors = registry.list(&filter).map(VendorSummary::from_record).collect::<Vec<_>>();
    let message = format!("{} of {} vendors matched", vendors.len(), registry.len());
    let data = json!({
        "counts": registry.status_counts(),
        "vendors": vendors,
    });

    CommandResult::success_with_data("list", message, Some(data))
}

fn build_filter(args: &ListArgs) -> Result<ListFilter, String> {
    let mut filter = ListFilter::default();

    if let Some(search) = &args.search {
        filter = filter.search(search.clone());
    }

    match (&args.section, &args.state) {
        (Some(section), Some(state)) => {
            let section = section.parse::<SectionName>().map_err(|error| error.to_string())?;
            let state = state.parse::<ApprovalState>().map_err(|error| error.to_string())?;
            filter = filter.section_state(section, state);
        }
        (None, None) => {}
        _ => return Err("--section and --state must be given together".to_string()),
    }

    if let Some(documents) = &args.documents {
        let completeness =
            documents.parse::<DocumentCompleteness>().map_err(|error| error.to_string())?;
        filter = filter.documents(completeness);
    }

    if let Some(overall) = &args.overall {
        filter = filter.overall(overall.parse::<ApprovalState>().map_err(|e| e.to_string())?);
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use vendorgate_core::domain::section::{ApprovalState, SectionName};
    use vendorgate_core::domain::vendor::DocumentCompleteness;
    use vendorgate_core::registry::ListFilter;

    use super::{build_filter, ListArgs};

    #[test]
    fn flags_become_a_combined_filter() {
        let args = ListArgs {
            search: Some("cedar".to_string()),
            section: Some("business".to_string()),
            state: Some("rejected".to_string()),
            documents: Some("partial".to_string()),
            overall: Some("rejected".to_string()),
        };

        let filter = build_filter(&args).expect("valid flags");

        assert_eq!(
            filter,
            ListFilter::default()
                .search("cedar")
                .section_state(SectionName::Business, ApprovalState::Rejected)
                .documents(DocumentCompleteness::Partial)
                .overall(ApprovalState::Rejected)
        );
    }

    #[test]
    fn section_without_state_is_rejected() {
        let args = ListArgs { section: Some("shop".to_string()), ..ListArgs::default() };

        assert!(build_filter(&args).is_err());
    }

    #[test]
    fn unknown_state_is_reported() {
        let args = ListArgs {
            section: Some("shop".to_string()),
            state: Some("paused".to_string()),
            ..ListArgs::default()
        };

        let error = build_filter(&args).expect_err("unknown state");

        assert!(error.contains("paused"), "{error}");
    }
}
