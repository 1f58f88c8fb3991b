pub mod persistence;
pub mod service;
pub mod workflow;

pub use persistence::ApprovalPersistence;
pub use service::ReviewService;
pub use workflow::{
    overall_status, ApprovalWorkflow, SectionChange, SectionUpdate, TransitionOutcome,
    DEFAULT_MAX_NOTE_LENGTH,
};
