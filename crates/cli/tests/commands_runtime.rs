use std::env;
use std::sync::{Mutex, OnceLock};

use helpline_cli::commands::{doctor, migrate};
use helpline_core::config::LoadOptions;
use serde_json::Value;

#[test]
fn migrate_reads_database_from_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("env.db").display());

    with_env(&[("HELPLINE_CHAT_BOT_TOKEN", "bot-token"), ("HELPLINE_DATABASE_URL", &url)], || {
        let result = migrate::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["details"]["pending"], serde_json::json!([]));
    });
}

#[test]
fn migrate_returns_config_failure_without_bot_token() {
    with_env(&[("HELPLINE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("chat.bot_token"));
    });
}

#[test]
fn migrate_reports_unreachable_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("missing").join("nested.db").display());

    with_env(&[("HELPLINE_CHAT_BOT_TOKEN", "bot-token"), ("HELPLINE_DATABASE_URL", &url)], || {
        let result = migrate::run(LoadOptions::default(), false);

        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "db_connectivity");
    });
}

#[test]
fn doctor_flags_invalid_category_list_from_environment() {
    with_env(
        &[
            ("HELPLINE_CHAT_BOT_TOKEN", "bot-token"),
            ("HELPLINE_DATABASE_URL", "sqlite::memory:"),
            ("HELPLINE_HELP_CATEGORIES", "Java,Java"),
        ],
        || {
            let result = doctor::run(LoadOptions::default(), true);
            assert_eq!(result.exit_code, 1);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["overall_status"], "fail");
            assert_eq!(payload["checks"][0]["name"], "config_validation");
            assert!(payload["checks"][0]["details"]
                .as_str()
                .unwrap_or_default()
                .contains("more than once"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "HELPLINE_DATABASE_URL",
        "HELPLINE_DATABASE_MAX_CONNECTIONS",
        "HELPLINE_DATABASE_TIMEOUT_SECS",
        "HELPLINE_CHAT_BOT_TOKEN",
        "HELPLINE_HELP_FORUM_PATTERN",
        "HELPLINE_HELP_CATEGORIES",
        "HELPLINE_HELP_ROLE_SUFFIX",
        "HELPLINE_HELP_MAX_TAGS",
        "HELPLINE_HELP_ACTIVITY_INTERVAL_SECS",
        "HELPLINE_MODERATION_MUTED_ROLE_PATTERN",
        "HELPLINE_MODERATION_QUARANTINED_ROLE_PATTERN",
        "HELPLINE_SERVER_BIND_ADDRESS",
        "HELPLINE_SERVER_HEALTH_CHECK_PORT",
        "HELPLINE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "HELPLINE_LOGGING_LEVEL",
        "HELPLINE_LOGGING_FORMAT",
        "HELPLINE_LOG_LEVEL",
        "HELPLINE_LOG_FORMAT",
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
