pub mod config;
pub mod history;
pub mod list;
pub mod migrate;
pub mod seed;
pub mod set_section;
pub mod show;

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use vendorgate_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use vendorgate_db::{connect, migrations, DbPool};

/// Failure class, message, and exit code of a command that did not complete.
pub(crate) type Failure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

impl GlobalOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }

    pub fn load_config(&self, command: &str) -> Result<AppConfig, CommandResult> {
        AppConfig::load(self.load_options()).map_err(|error| {
            CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            )
        })
    }
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub(crate) fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and brings the schema up to date. Only `migrate` and `seed` use this.
pub(crate) async fn open_migrated_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_database(config).await?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

/// Connects without touching the schema; fails when migrations are outstanding.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_database(config).await?;
    let current = migrations::is_up_to_date(&pool)
        .await
        .map_err(|error| ("db_read", error.to_string(), 4u8))?;
    if !current {
        pool.close().await;
        return Err(schema_not_migrated());
    }
    Ok(pool)
}

async fn connect_database(config: &AppConfig) -> Result<DbPool, Failure> {
    connect(&config.database).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))
}

fn schema_not_migrated() -> Failure {
    (
        "schema_not_migrated",
        "database schema is missing or outdated; run `vendorgate migrate` first".to_string(),
        5,
    )
}

pub(crate) fn unknown_vendor(vendor_id: &str) -> Failure {
    ("unknown_vendor", format!("unknown vendor `{vendor_id}`"), 7)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\
             \"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{CommandResult, GlobalOptions};

    #[test]
    fn failure_payload_carries_class_and_exit_code() {
        let result = CommandResult::failure("show", "unknown_vendor", "unknown vendor `V-9`", 7);
        let payload: Value = serde_json::from_str(&result.output).expect("json payload");

        assert_eq!(result.exit_code, 7);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "unknown_vendor");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn success_payload_embeds_data() {
        let result =
            CommandResult::success_with_data("list", "2 vendors", Some(json!({"total": 2})));
        let payload: Value = serde_json::from_str(&result.output).expect("json payload");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["error_class"], Value::Null);
        assert_eq!(payload["data"]["total"], 2);
    }

    #[test]
    fn explicit_config_path_is_required() {
        let options = GlobalOptions {
            config_path: Some("missing/vendorgate.toml".into()),
            database_url: Some("sqlite::memory:".to_string()),
            ..GlobalOptions::default()
        };

        let load = options.load_options();

        assert!(load.require_file);
        assert_eq!(load.overrides.database_url.as_deref(), Some("sqlite::memory:"));
    }
}
