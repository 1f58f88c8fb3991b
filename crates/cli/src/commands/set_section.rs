use serde_json::json;
use uuid::Uuid;

use crate::commands::{build_runtime, open_database, CommandResult, Failure, GlobalOptions};
use vendorgate_core::approvals::{overall_status, ApprovalWorkflow, ReviewService, SectionUpdate};
use vendorgate_core::audit::{AuditContext, InMemoryAuditSink};
use vendorgate_core::domain::vendor::VendorId;
use vendorgate_core::errors::{ApplicationError, InterfaceError, WorkflowError};
use vendorgate_db::{load_vendor, SqlVendorApprovalRepository};

#[derive(Debug, Clone, Default)]
pub struct SetSectionArgs {
    pub vendor_id: String,
    pub section: String,
    pub state: String,
    pub note: Option<String>,
    pub reviewer: Option<String>,
    pub correlation_id: Option<String>,
}

enum SetSectionError {
    Setup(Failure),
    Workflow(WorkflowError),
}

pub fn run(options: &GlobalOptions, args: &SetSectionArgs) -> CommandResult {
    let config = match options.load_config("set-section") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("set-section") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let correlation_id =
        args.correlation_id.clone().unwrap_or_else(|| format!("cli-{}", Uuid::new_v4()));
    let reviewer = args
        .reviewer
        .as_deref()
        .map(str::trim)
        .filter(|reviewer| !reviewer.is_empty())
        .unwrap_or(&config.review.default_reviewer)
        .to_string();
    let context = AuditContext::new(correlation_id, reviewer);
    let audit = InMemoryAuditSink::default();

    let mut update = SectionUpdate::new(args.section.as_str(), args.state.as_str());
    if let Some(note) = &args.note {
        update = update.with_note(note.as_str());
    }

    let vendor_id = VendorId(args.vendor_id.clone());
    let result = runtime.block_on(async {
        let pool = open_database(&config).await.map_err(SetSectionError::Setup)?;
        let repository = SqlVendorApprovalRepository::new(pool.clone());
        let registry = load_vendor(&repository, &vendor_id).await.map_err(|error| {
            SetSectionError::Setup(("db_read", error.to_string(), 4u8))
        })?;

        let mut service = ReviewService::new(
            ApprovalWorkflow::new(config.review.max_note_length),
            registry,
            repository,
            audit.clone(),
        );
        let outcome = service.set_section_status(&vendor_id, &update, &context).await;
        pool.close().await;

        outcome.map_err(SetSectionError::Workflow)
    });

    match result {
        Ok(record) => {
            let overall = overall_status(&record);
            let message = format!(
                "{} {} is now {} (overall: {})",
                record.vendor_id, args.section, args.state, overall
            );
            let data = json!({
                "correlationId": context.correlation_id,
                "overallStatus": overall,
                "record": record,
                "auditEvents": audit.events(),
            });
            CommandResult::success_with_data("set-section", message, Some(data))
        }
        Err(SetSectionError::Setup(failure)) => {
            CommandResult::from_failure("set-section", failure)
        }
        Err(SetSectionError::Workflow(error)) => {
            let error_class = error.error_class();
            let retryable = error.is_retryable();
            let detail = error.to_string();
            let interface =
                ApplicationError::from(error).into_interface(context.correlation_id.as_str());
            let exit_code = match interface {
                InterfaceError::BadRequest { .. } => 7,
                InterfaceError::ServiceUnavailable { .. } => 8,
                InterfaceError::Internal { .. } => 1,
            };
            let data = json!({
                "correlationId": interface.correlation_id(),
                "retryable": retryable,
                "detail": detail,
                "auditEvents": audit.events(),
            });
            CommandResult::failure_with_data(
                "set-section",
                error_class,
                interface.user_message(),
                exit_code,
                Some(data),
            )
        }
    }
}
