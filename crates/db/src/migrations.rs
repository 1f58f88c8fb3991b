use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Whether every embedded migration has been applied. Never writes to the database.
pub async fn is_up_to_date(pool: &DbPool) -> Result<bool, sqlx::Error> {
    let ledger: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;
    if ledger.is_none() {
        return Ok(false);
    }

    let applied: Vec<i64> =
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
    Ok(MIGRATOR.iter().all(|migration| applied.contains(&migration.version)))
}

#[cfg(test)]
mod tests {
    use super::{is_up_to_date, run_pending};
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "vendor_approval",
        "vendor_approval_section",
        "section_transition",
        "idx_vendor_approval_section_state",
        "idx_section_transition_vendor_id",
    ];

    #[tokio::test]
    async fn migrations_create_review_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for object in MANAGED_SCHEMA_OBJECTS {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = ?1")
                    .bind(*object)
                    .fetch_one(&pool)
                    .await
                    .expect("query sqlite_master");
            assert_eq!(count, 1, "expected schema object `{object}` after migrations");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run is a no-op");
    }

    #[tokio::test]
    async fn schema_check_reports_missing_migrations_without_applying_them() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        assert!(!is_up_to_date(&pool).await.expect("check fresh database"));
        let tables: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master")
            .fetch_one(&pool)
            .await
            .expect("count schema objects");
        assert_eq!(tables, 0);

        run_pending(&pool).await.expect("run migrations");
        assert!(is_up_to_date(&pool).await.expect("check migrated database"));
    }

    #[tokio::test]
    async fn section_states_are_constrained() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        sqlx::query(
            "INSERT INTO vendor_approval (vendor_id, account_type, display_name, created_at,
                                          updated_at)
             VALUES ('V-1', 'individual', 'Ada', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert vendor");

        let result = sqlx::query(
            "INSERT INTO vendor_approval_section (vendor_id, section, state)
             VALUES ('V-1', 'shipping', 'half-approved')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "check constraint should reject unknown states");
    }
}
