use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One independently reviewable facet of a vendor submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Shop,
    Business,
    Shipping,
    Payment,
    Profile,
}

impl SectionName {
    pub const ALL: [SectionName; 5] = [
        SectionName::Shop,
        SectionName::Business,
        SectionName::Shipping,
        SectionName::Payment,
        SectionName::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shop => "shop",
            Self::Business => "business",
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown section `{0}` (expected shop|business|shipping|payment|profile)")]
pub struct UnknownSectionName(pub String);

impl FromStr for SectionName {
    type Err = UnknownSectionName;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "shop" => Ok(Self::Shop),
            "business" => Ok(Self::Business),
            "shipping" => Ok(Self::Shipping),
            "payment" => Ok(Self::Payment),
            "profile" => Ok(Self::Profile),
            _ => Err(UnknownSectionName(value.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub const ALL: [ApprovalState; 4] = [
        ApprovalState::Pending,
        ApprovalState::UnderReview,
        ApprovalState::Approved,
        ApprovalState::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown approval state `{0}` (expected pending|under_review|approved|rejected)")]
pub struct UnknownApprovalState(pub String);

impl FromStr for ApprovalState {
    type Err = UnknownApprovalState;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "under_review" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownApprovalState(value.to_string())),
        }
    }
}

/// State of a single section plus the reviewer note attached with it.
///
/// The note is advisory only; nothing in the workflow branches on it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatus {
    #[serde(default)]
    pub state: ApprovalState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SectionStatus {
    pub fn new(state: ApprovalState, note: Option<String>) -> Self {
        Self { state, note }
    }
}

/// Which sections a vendor's review covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowVariant {
    #[default]
    Onboarding,
    LicenseReview,
}

impl WorkflowVariant {
    pub fn sections(&self) -> &'static [SectionName] {
        match self {
            Self::Onboarding => &SectionName::ALL,
            Self::LicenseReview => &[SectionName::Business],
        }
    }

    pub fn includes(&self, section: SectionName) -> bool {
        self.sections().contains(&section)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::LicenseReview => "license_review",
        }
    }
}

impl fmt::Display for WorkflowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unsupported workflow variant `{0}` (expected onboarding|license_review)")]
pub struct UnknownWorkflowVariant(pub String);

impl FromStr for WorkflowVariant {
    type Err = UnknownWorkflowVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "onboarding" => Ok(Self::Onboarding),
            "license_review" => Ok(Self::LicenseReview),
            _ => Err(UnknownWorkflowVariant(value.to_string())),
        }
    }
}
