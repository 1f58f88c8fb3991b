pub mod approvals;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod registry;

pub use approvals::{
    overall_status, ApprovalPersistence, ApprovalWorkflow, ReviewService, SectionChange,
    SectionUpdate, TransitionOutcome,
};
pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink};
pub use domain::section::{ApprovalState, SectionName, SectionStatus, WorkflowVariant};
pub use domain::vendor::{
    AccountType, DocumentCompleteness, VendorApprovalRecord, VendorId, VendorProfile,
};
pub use errors::{ApplicationError, InterfaceError, PersistenceError, WorkflowError};
pub use registry::{ApprovalRegistry, ListFilter, SectionStateFilter, StatusCounts};
