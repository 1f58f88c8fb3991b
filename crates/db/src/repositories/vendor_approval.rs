use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use vendorgate_core::approvals::{ApprovalPersistence, SectionChange};
use vendorgate_core::domain::section::{ApprovalState, SectionName, SectionStatus};
use vendorgate_core::domain::vendor::{VendorApprovalRecord, VendorId, VendorProfile};
use vendorgate_core::errors::PersistenceError;

use super::{RepositoryError, VendorApprovalRepository};
use crate::DbPool;

const RECORD_COLUMNS: &str = "vendor_id, account_type, workflow_variant, display_name, \
     company_name, shop_name, contact_email, contact_phone, document_completeness, \
     created_at, updated_at";

pub struct SqlVendorApprovalRepository {
    pool: DbPool,
}

impl SqlVendorApprovalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(column: &str, raw: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
{
    raw.parse::<T>()
        .map_err(|_| RepositoryError::Decode(format!("unexpected {column} value `{raw}`")))
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid {column} `{raw}`: {e}")))
}

fn column<T>(row: &SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_record(row: &SqliteRow) -> Result<VendorApprovalRecord, RepositoryError> {
    let vendor_id: String = column(row, "vendor_id")?;
    let account_type: String = column(row, "account_type")?;
    let variant: String = column(row, "workflow_variant")?;
    let document_completeness: String = column(row, "document_completeness")?;
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;

    Ok(VendorApprovalRecord {
        vendor_id: VendorId(vendor_id),
        account_type: decode("account_type", &account_type)?,
        variant: decode("workflow_variant", &variant)?,
        profile: VendorProfile {
            display_name: column(row, "display_name")?,
            company_name: column(row, "company_name")?,
            shop_name: column(row, "shop_name")?,
            contact_email: column(row, "contact_email")?,
            contact_phone: column(row, "contact_phone")?,
        },
        document_completeness: decode("document_completeness", &document_completeness)?,
        sections: BTreeMap::new(),
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

type SectionRow = (String, SectionName, SectionStatus);

fn row_to_section(row: &SqliteRow) -> Result<SectionRow, RepositoryError> {
    let vendor_id: String = column(row, "vendor_id")?;
    let section: String = column(row, "section")?;
    let state: String = column(row, "state")?;
    let note: Option<String> = column(row, "note")?;

    Ok((
        vendor_id,
        decode("section", &section)?,
        SectionStatus::new(decode::<ApprovalState>("state", &state)?, note),
    ))
}

fn row_to_change(row: &SqliteRow) -> Result<SectionChange, RepositoryError> {
    let section: String = column(row, "section")?;
    let from_state: String = column(row, "from_state")?;
    let to_state: String = column(row, "to_state")?;
    let changed_at: String = column(row, "changed_at")?;
    let from_note: Option<String> = column(row, "from_note")?;
    let to_note: Option<String> = column(row, "to_note")?;

    Ok(SectionChange {
        change_id: column(row, "change_id")?,
        vendor_id: VendorId(column(row, "vendor_id")?),
        section: decode("section", &section)?,
        previous: SectionStatus::new(decode("from_state", &from_state)?, from_note),
        current: SectionStatus::new(decode("to_state", &to_state)?, to_note),
        reviewer: column(row, "reviewer")?,
        changed_at: parse_timestamp("changed_at", &changed_at)?,
    })
}

async fn upsert_record(
    conn: &mut SqliteConnection,
    record: &VendorApprovalRecord,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO vendor_approval (vendor_id, account_type, workflow_variant, display_name,
                                      company_name, shop_name, contact_email, contact_phone,
                                      document_completeness, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(vendor_id) DO UPDATE SET
             account_type = excluded.account_type,
             workflow_variant = excluded.workflow_variant,
             display_name = excluded.display_name,
             company_name = excluded.company_name,
             shop_name = excluded.shop_name,
             contact_email = excluded.contact_email,
             contact_phone = excluded.contact_phone,
             document_completeness = excluded.document_completeness,
             updated_at = excluded.updated_at",
    )
    .bind(&record.vendor_id.0)
    .bind(record.account_type.as_str())
    .bind(record.variant.as_str())
    .bind(&record.profile.display_name)
    .bind(&record.profile.company_name)
    .bind(&record.profile.shop_name)
    .bind(&record.profile.contact_email)
    .bind(&record.profile.contact_phone)
    .bind(record.document_completeness.as_str())
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    // The section map is stored whole so a replayed save converges on the same rows.
    sqlx::query("DELETE FROM vendor_approval_section WHERE vendor_id = ?")
        .bind(&record.vendor_id.0)
        .execute(&mut *conn)
        .await?;

    for (section, status) in &record.sections {
        sqlx::query(
            "INSERT INTO vendor_approval_section (vendor_id, section, state, note)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&record.vendor_id.0)
        .bind(section.as_str())
        .bind(status.state.as_str())
        .bind(&status.note)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Writes the one section a transition touched; sibling section rows are never
/// rewritten and `updated_at` never moves backwards.
async fn upsert_section(
    conn: &mut SqliteConnection,
    record: &VendorApprovalRecord,
    change: &SectionChange,
) -> Result<(), RepositoryError> {
    let touched = sqlx::query(
        "UPDATE vendor_approval SET updated_at = ?
         WHERE vendor_id = ? AND updated_at < ?",
    )
    .bind(record.updated_at.to_rfc3339())
    .bind(&record.vendor_id.0)
    .bind(record.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if touched == 0 {
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM vendor_approval WHERE vendor_id = ?")
                .bind(&record.vendor_id.0)
                .fetch_optional(&mut *conn)
                .await?;
        if exists.is_none() {
            return upsert_record(conn, record).await;
        }
    }

    sqlx::query(
        "INSERT INTO vendor_approval_section (vendor_id, section, state, note)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(vendor_id, section) DO UPDATE SET
             state = excluded.state,
             note = excluded.note",
    )
    .bind(&change.vendor_id.0)
    .bind(change.section.as_str())
    .bind(change.current.state.as_str())
    .bind(&change.current.note)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_change(
    conn: &mut SqliteConnection,
    change: &SectionChange,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO section_transition (change_id, vendor_id, section, from_state, from_note,
                                         to_state, to_note, reviewer, changed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(change_id) DO NOTHING",
    )
    .bind(&change.change_id)
    .bind(&change.vendor_id.0)
    .bind(change.section.as_str())
    .bind(change.previous.state.as_str())
    .bind(&change.previous.note)
    .bind(change.current.state.as_str())
    .bind(&change.current.note)
    .bind(&change.reviewer)
    .bind(change.changed_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl VendorApprovalRepository for SqlVendorApprovalRepository {
    async fn find_by_id(
        &self,
        id: &VendorId,
    ) -> Result<Option<VendorApprovalRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM vendor_approval WHERE vendor_id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = row_to_record(&row)?;

        let section_rows = sqlx::query(
            "SELECT vendor_id, section, state, note FROM vendor_approval_section
             WHERE vendor_id = ?",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        for row in &section_rows {
            let (_, section, status) = row_to_section(row)?;
            record.sections.insert(section, status);
        }

        Ok(Some(record))
    }

    async fn list_all(&self) -> Result<Vec<VendorApprovalRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM vendor_approval ORDER BY vendor_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut records = rows
            .iter()
            .map(|row| row_to_record(row).map(|record| (record.vendor_id.0.clone(), record)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let section_rows =
            sqlx::query("SELECT vendor_id, section, state, note FROM vendor_approval_section")
                .fetch_all(&self.pool)
                .await?;

        for row in &section_rows {
            let (vendor_id, section, status) = row_to_section(row)?;
            if let Some(record) = records.get_mut(&vendor_id) {
                record.sections.insert(section, status);
            }
        }

        Ok(records.into_values().collect())
    }

    async fn save(&self, record: &VendorApprovalRecord) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        upsert_record(&mut tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_change(&self, change: &SectionChange) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_change(&mut conn, change).await
    }

    async fn list_changes(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Vec<SectionChange>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT change_id, vendor_id, section, from_state, from_note, to_state, to_note,
                    reviewer, changed_at
             FROM section_transition
             WHERE vendor_id = ?
             ORDER BY changed_at ASC, rowid ASC",
        )
        .bind(&vendor_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_change).collect()
    }
}

#[async_trait]
impl ApprovalPersistence for SqlVendorApprovalRepository {
    async fn persist(
        &self,
        record: &VendorApprovalRecord,
        change: &SectionChange,
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        upsert_section(&mut tx, record, change).await?;
        insert_change(&mut tx, change).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}
