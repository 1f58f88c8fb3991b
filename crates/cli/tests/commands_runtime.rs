use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tempfile::TempDir;

use vendorgate_cli::commands::list::ListArgs;
use vendorgate_cli::commands::set_section::SetSectionArgs;
use vendorgate_cli::commands::{config, history, list, migrate, seed, set_section, show};
use vendorgate_cli::commands::GlobalOptions;

#[test]
fn migrate_returns_success_on_fresh_database() {
    with_database(|options| {
        let result = migrate::run(options);
        assert_eq!(result.exit_code, 0, "expected successful migrate run: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn invalid_database_url_is_a_config_failure() {
    with_env(&[], || {
        let options = GlobalOptions {
            database_url: Some("postgres://localhost/vendors".to_string()),
            ..GlobalOptions::default()
        };

        let result = migrate::run(&options);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_database(|options| {
        let first = seed::run(options);
        assert_eq!(first.exit_code, 0, "expected first seed success: {}", first.output);
        let second = seed::run(options);
        assert_eq!(second.exit_code, 0, "expected second seed success: {}", second.output);

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);

        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("  - V-1004 [under_review]: License review in progress"));
        assert_eq!(first_payload["data"]["vendors"].as_array().map(Vec::len), Some(5));
    });
}

#[test]
fn list_reports_counts_and_filters() {
    with_database(|options| {
        assert_eq!(seed::run(options).exit_code, 0);

        let all = parse_payload(&list::run(options, &ListArgs::default()).output);
        assert_eq!(all["status"], "ok");
        assert_eq!(all["data"]["vendors"].as_array().map(Vec::len), Some(5));
        assert_eq!(all["data"]["counts"]["rejected"], 2);
        assert_eq!(all["data"]["counts"]["approved"], 1);
        assert_eq!(all["data"]["counts"]["under_review"], 1);
        assert_eq!(all["data"]["counts"]["pending"], 1);

        let filtered = parse_payload(
            &list::run(
                options,
                &ListArgs {
                    section: Some("business".to_string()),
                    state: Some("rejected".to_string()),
                    ..ListArgs::default()
                },
            )
            .output,
        );
        let vendors = filtered["data"]["vendors"].as_array().cloned().unwrap_or_default();
        assert_eq!(vendors.len(), 1);
        assert_eq!(vendors[0]["vendorId"], "V-1003");
        assert_eq!(vendors[0]["reviewLabel"], "Cedar Candle Co");
        assert_eq!(vendors[0]["sections"]["business"]["note"], "tax certificate expired");
    });
}

#[test]
fn list_rejects_unknown_filter_values() {
    with_database(|options| {
        let result = list::run(
            options,
            &ListArgs { overall: Some("paused".to_string()), ..ListArgs::default() },
        );

        assert_eq!(result.exit_code, 7);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_filter");
    });
}

#[test]
fn set_section_persists_and_records_history() {
    with_database(|options| {
        assert_eq!(seed::run(options).exit_code, 0);

        let result = set_section::run(
            options,
            &SetSectionArgs {
                vendor_id: "V-1003".to_string(),
                section: "business".to_string(),
                state: "approved".to_string(),
                note: Some("  certificate renewed  ".to_string()),
                reviewer: Some("admin:ines".to_string()),
                correlation_id: Some("req-cli-1".to_string()),
            },
        );
        assert_eq!(result.exit_code, 0, "expected set-section success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["correlationId"], "req-cli-1");
        assert_eq!(payload["data"]["overallStatus"], "under_review");
        assert_eq!(payload["data"]["auditEvents"][0]["event_type"], "review.section_updated");

        let shown = parse_payload(&show::run(options, "V-1003").output);
        assert_eq!(shown["data"]["sectionStatuses"]["business"]["state"], "approved");
        assert_eq!(shown["data"]["sectionStatuses"]["business"]["note"], "certificate renewed");

        let history = parse_payload(&history::run(options, "V-1003").output);
        let changes = history["data"]["changes"].as_array().cloned().unwrap_or_default();
        let latest = changes.last().cloned().unwrap_or_default();
        assert_eq!(changes.len(), 4, "three seeded transitions plus the new one");
        assert_eq!(latest["reviewer"], "admin:ines");
        assert_eq!(latest["previous"]["state"], "rejected");
        assert_eq!(latest["current"]["state"], "approved");
    });
}

#[test]
fn set_section_validation_errors_are_not_retryable() {
    with_database(|options| {
        assert_eq!(seed::run(options).exit_code, 0);

        let result = set_section::run(
            options,
            &SetSectionArgs {
                vendor_id: "V-1001".to_string(),
                section: "shop".to_string(),
                state: "half_approved".to_string(),
                ..SetSectionArgs::default()
            },
        );

        assert_eq!(result.exit_code, 7);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_state");
        assert_eq!(payload["data"]["retryable"], false);
        assert_eq!(payload["data"]["auditEvents"][0]["outcome"], "Rejected");

        let shown = parse_payload(&show::run(options, "V-1001").output);
        assert_eq!(shown["data"]["overallStatus"], "pending");
    });
}

#[test]
fn set_section_outside_variant_is_unknown_section() {
    with_database(|options| {
        assert_eq!(seed::run(options).exit_code, 0);

        let result = set_section::run(
            options,
            &SetSectionArgs {
                vendor_id: "V-1004".to_string(),
                section: "shipping".to_string(),
                state: "approved".to_string(),
                ..SetSectionArgs::default()
            },
        );

        assert_eq!(result.exit_code, 7);
        assert_eq!(parse_payload(&result.output)["error_class"], "unknown_section");
    });
}

#[test]
fn unknown_vendor_is_reported_by_every_vendor_command() {
    with_database(|options| {
        assert_eq!(migrate::run(options).exit_code, 0);

        let update = set_section::run(
            options,
            &SetSectionArgs {
                vendor_id: "V-404".to_string(),
                section: "shop".to_string(),
                state: "approved".to_string(),
                ..SetSectionArgs::default()
            },
        );
        let shown = show::run(options, "V-404");
        let history = history::run(options, "V-404");

        for result in [update, shown, history] {
            assert_eq!(result.exit_code, 7, "{}", result.output);
            assert_eq!(parse_payload(&result.output)["error_class"], "unknown_vendor");
        }
    });
}

#[test]
fn read_commands_require_a_migrated_schema() {
    with_database(|options| {
        let shown = show::run(options, "V-1001");
        let listed = list::run(options, &ListArgs::default());
        let history = history::run(options, "V-1001");

        for result in [shown, listed, history] {
            assert_eq!(result.exit_code, 5, "{}", result.output);
            assert_eq!(parse_payload(&result.output)["error_class"], "schema_not_migrated");
        }

        let still_unmigrated = show::run(options, "V-1001");
        assert_eq!(still_unmigrated.exit_code, 5, "reads must not apply migrations");

        assert_eq!(migrate::run(options).exit_code, 0);
        let listed = parse_payload(&list::run(options, &ListArgs::default()).output);
        assert_eq!(listed["status"], "ok");
        assert_eq!(listed["data"]["vendors"].as_array().map(Vec::len), Some(0));
    });
}

#[test]
fn set_section_rejects_uppercase_state() {
    with_database(|options| {
        assert_eq!(seed::run(options).exit_code, 0);

        let result = set_section::run(
            options,
            &SetSectionArgs {
                vendor_id: "V-1001".to_string(),
                section: "shop".to_string(),
                state: "APPROVED".to_string(),
                ..SetSectionArgs::default()
            },
        );

        assert_eq!(result.exit_code, 7);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_state");
    });
}

#[test]
fn config_reports_flag_sources() {
    with_database(|options| {
        let result = config::run(options);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["sources"]["database.url"], "flag (--database-url)");
        assert_eq!(payload["data"]["sources"]["review.max_note_length"], "default");
        assert_eq!(payload["data"]["effective"]["review"]["default_reviewer"], "admin");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_database(test_fn: impl FnOnce(&GlobalOptions)) {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("vendorgate-test.db");
        let options = GlobalOptions {
            database_url: Some(format!("sqlite://{}", path.display())),
            ..GlobalOptions::default()
        };
        test_fn(&options);
    });
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "VENDORGATE_DATABASE_URL",
        "VENDORGATE_DATABASE_MAX_CONNECTIONS",
        "VENDORGATE_DATABASE_TIMEOUT_SECS",
        "VENDORGATE_LOGGING_LEVEL",
        "VENDORGATE_LOGGING_FORMAT",
        "VENDORGATE_LOG_LEVEL",
        "VENDORGATE_LOG_FORMAT",
        "VENDORGATE_REVIEW_DEFAULT_REVIEWER",
        "VENDORGATE_REVIEW_MAX_NOTE_LENGTH",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
