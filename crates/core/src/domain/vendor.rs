use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::section::{SectionName, SectionStatus, WorkflowVariant};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VendorId(pub String);

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Individual,
    Company,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Company => "company",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unsupported account type `{0}` (expected individual|company)")]
pub struct UnknownAccountType(pub String);

impl FromStr for AccountType {
    type Err = UnknownAccountType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "individual" => Ok(Self::Individual),
            "company" => Ok(Self::Company),
            _ => Err(UnknownAccountType(value.to_string())),
        }
    }
}

/// Display fields supplied by the identity/profile store. Read-only here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorProfile {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

/// Precomputed tag describing which required documents a vendor has uploaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCompleteness {
    Complete,
    Partial,
    #[default]
    Missing,
}

impl DocumentCompleteness {
    /// Derives the tag from per-document presence flags reported by the document store.
    pub fn from_presence<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let (present, total) =
            flags.into_iter().fold((0usize, 0usize), |(present, total), flag| {
                (present + usize::from(flag), total + 1)
            });

        match (present, total) {
            (0, _) => Self::Missing,
            (present, total) if present == total => Self::Complete,
            _ => Self::Partial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Missing => "missing",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unsupported document completeness `{0}` (expected complete|partial|missing)")]
pub struct UnknownDocumentCompleteness(pub String);

impl FromStr for DocumentCompleteness {
    type Err = UnknownDocumentCompleteness;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "complete" => Ok(Self::Complete),
            "partial" => Ok(Self::Partial),
            "missing" => Ok(Self::Missing),
            _ => Err(UnknownDocumentCompleteness(value.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorApprovalRecord {
    pub vendor_id: VendorId,
    pub account_type: AccountType,
    #[serde(default)]
    pub variant: WorkflowVariant,
    pub profile: VendorProfile,
    #[serde(default)]
    pub document_completeness: DocumentCompleteness,
    #[serde(default)]
    pub sections: BTreeMap<SectionName, SectionStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VendorApprovalRecord {
    pub fn new(
        vendor_id: VendorId,
        account_type: AccountType,
        variant: WorkflowVariant,
        profile: VendorProfile,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            vendor_id,
            account_type,
            variant,
            profile,
            document_completeness: DocumentCompleteness::default(),
            sections: BTreeMap::new(),
            created_at,
            updated_at: created_at,
        }
    }

    pub fn with_document_completeness(mut self, completeness: DocumentCompleteness) -> Self {
        self.document_completeness = completeness;
        self
    }

    /// Status of `section`, reading an absent entry as pending with no note.
    pub fn section(&self, section: SectionName) -> SectionStatus {
        self.sections.get(&section).cloned().unwrap_or_default()
    }

    /// Every section of this record's variant with read-time defaults applied.
    pub fn section_statuses(&self) -> Vec<(SectionName, SectionStatus)> {
        self.variant.sections().iter().map(|section| (*section, self.section(*section))).collect()
    }

    /// Name a reviewer should see: the legal entity for companies, the person otherwise.
    pub fn review_label(&self) -> &str {
        match self.account_type {
            AccountType::Company => self
                .profile
                .company_name
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(&self.profile.display_name),
            AccountType::Individual => &self.profile.display_name,
        }
    }

    pub(crate) fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

        contains(&self.vendor_id.0)
            || contains(&self.profile.display_name)
            || self.profile.company_name.as_deref().is_some_and(contains)
            || self.profile.shop_name.as_deref().is_some_and(contains)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::section::{ApprovalState, SectionName, WorkflowVariant};

    use super::{
        AccountType, DocumentCompleteness, UnknownAccountType, UnknownDocumentCompleteness,
        VendorApprovalRecord, VendorId, VendorProfile,
    };

    fn record(account_type: AccountType) -> VendorApprovalRecord {
        VendorApprovalRecord::new(
            VendorId("V-100".to_string()),
            account_type,
            WorkflowVariant::Onboarding,
            VendorProfile {
                display_name: "Ada Obi".to_string(),
                company_name: Some("Obi Textiles Ltd".to_string()),
                shop_name: Some("Kente Corner".to_string()),
                ..VendorProfile::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn fresh_record_reads_every_section_as_pending() {
        let record = record(AccountType::Individual);

        let statuses = record.section_statuses();
        assert_eq!(statuses.len(), SectionName::ALL.len());
        assert!(statuses
            .iter()
            .all(|(_, status)| status.state == ApprovalState::Pending && status.note.is_none()));
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn review_label_depends_on_account_type() {
        assert_eq!(record(AccountType::Company).review_label(), "Obi Textiles Ltd");
        assert_eq!(record(AccountType::Individual).review_label(), "Ada Obi");

        let mut blank_company = record(AccountType::Company);
        blank_company.profile.company_name = Some("  ".to_string());
        assert_eq!(blank_company.review_label(), "Ada Obi");
    }

    #[test]
    fn search_matches_id_and_names_case_insensitively() {
        let record = record(AccountType::Company);

        assert!(record.matches_search("v-1"));
        assert!(record.matches_search("TEXTILES"));
        assert!(record.matches_search("kente"));
        assert!(!record.matches_search("pottery"));
    }

    #[test]
    fn tags_parse_only_their_stored_spelling() {
        assert_eq!("company".parse::<AccountType>(), Ok(AccountType::Company));
        assert_eq!("Company".parse::<AccountType>(), Err(UnknownAccountType("Company".into())));
        assert_eq!("partial".parse::<DocumentCompleteness>(), Ok(DocumentCompleteness::Partial));
        assert_eq!(
            " missing".parse::<DocumentCompleteness>(),
            Err(UnknownDocumentCompleteness(" missing".into()))
        );
    }

    #[test]
    fn document_completeness_from_presence_flags() {
        use DocumentCompleteness::{Complete, Missing, Partial};

        assert_eq!(DocumentCompleteness::from_presence([true, true]), Complete);
        assert_eq!(DocumentCompleteness::from_presence([true, false]), Partial);
        assert_eq!(DocumentCompleteness::from_presence([false, false]), Missing);
        assert_eq!(DocumentCompleteness::from_presence(Vec::new()), DocumentCompleteness::Missing);
    }

    #[test]
    fn record_serializes_with_stable_export_field_names() {
        let value = serde_json::to_value(record(AccountType::Individual)).expect("serialize");

        assert_eq!(value["vendorId"], "V-100");
        assert_eq!(value["accountType"], "individual");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
    }
}
