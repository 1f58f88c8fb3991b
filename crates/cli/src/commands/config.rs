use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value as JsonValue};
use toml::Value;

use crate::commands::{CommandResult, GlobalOptions};
use vendorgate_core::config::CONFIG_FILE_NAME;

/// Key path, primary environment variable, and the CLI flag that overrides it.
const FIELDS: &[(&str, &str, Option<&str>)] = &[
    ("database.url", "VENDORGATE_DATABASE_URL", Some("--database-url")),
    ("database.max_connections", "VENDORGATE_DATABASE_MAX_CONNECTIONS", None),
    ("database.timeout_secs", "VENDORGATE_DATABASE_TIMEOUT_SECS", None),
    ("logging.level", "VENDORGATE_LOGGING_LEVEL", Some("--log-level")),
    ("logging.format", "VENDORGATE_LOGGING_FORMAT", None),
    ("review.default_reviewer", "VENDORGATE_REVIEW_DEFAULT_REVIEWER", None),
    ("review.max_note_length", "VENDORGATE_REVIEW_MAX_NOTE_LENGTH", None),
];

pub fn run(options: &GlobalOptions) -> CommandResult {
    let config = match options.load_config("config") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut sources = Map::new();
    for (key_path, env_key, flag) in FIELDS {
        let flag_set = match *key_path {
            "database.url" => options.database_url.is_some(),
            "logging.level" => options.log_level.is_some(),
            _ => false,
        };
        let source = match flag {
            Some(flag) if flag_set => format!("flag ({flag})"),
            _ => field_source(
                key_path,
                env_key,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        };
        sources.insert((*key_path).to_string(), JsonValue::String(source));
    }

    let effective = match serde_json::to_value(&config) {
        Ok(value) => value,
        Err(error) => {
            return CommandResult::failure("config", "serialization", error.to_string(), 1)
        }
    };

    let message = "effective config (source precedence: flag > env > file > default)";
    let data = json!({
        "configFile": config_file_path.map(|path| path.display().to_string()),
        "effective": effective,
        "sources": sources,
    });
    CommandResult::success_with_data("config", message, Some(data))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from(CONFIG_FILE_NAME);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(CONFIG_FILE_NAME);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
