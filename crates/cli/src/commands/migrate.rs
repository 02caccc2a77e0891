use helpline_core::config::{AppConfig, LoadOptions};
use helpline_db::{connect_with_settings, migrations};
use serde_json::json;

use crate::commands::{runtime, CommandResult};

type Failure = (&'static str, String, u8);

pub fn run(options: LoadOptions, status_only: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(migrate(&config, status_only)) {
        Ok((pending, _)) if status_only => CommandResult::success_with(
            "migrate",
            format!("{} pending migration(s)", pending.len()),
            Some(json!({ "pending": pending })),
        ),
        Ok((before, after)) => {
            let applied: Vec<i64> =
                before.iter().copied().filter(|version| !after.contains(version)).collect();
            CommandResult::success_with(
                "migrate",
                format!("applied {} pending migration(s)", applied.len()),
                Some(json!({ "applied": applied, "pending": after })),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

async fn migrate(config: &AppConfig, status_only: bool) -> Result<(Vec<i64>, Vec<i64>), Failure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4))?;

    let before = migrations::pending_versions(&pool)
        .await
        .map_err(|error| ("migration_status", error.to_string(), 5))?;
    if status_only {
        pool.close().await;
        return Ok((before.clone(), before));
    }

    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5))?;
    let after = migrations::pending_versions(&pool)
        .await
        .map_err(|error| ("migration_status", error.to_string(), 5))?;
    pool.close().await;

    Ok((before, after))
}

#[cfg(test)]
mod tests {
    use helpline_core::config::{ConfigOverrides, LoadOptions};

    use super::run;

    fn options_for(database_url: String) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url),
                bot_token: Some("bot-token".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    fn output(result: &super::CommandResult) -> serde_json::Value {
        serde_json::from_str(&result.output).expect("json output")
    }

    #[test]
    fn status_lists_pending_then_migrate_applies_them() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("helpline.db").display());

        let status = run(options_for(url.clone()), true);
        assert_eq!(status.exit_code, 0);
        assert_eq!(output(&status)["details"]["pending"], serde_json::json!([1, 2]));

        let applied = run(options_for(url.clone()), false);
        assert_eq!(applied.exit_code, 0);
        assert_eq!(output(&applied)["details"]["applied"], serde_json::json!([1, 2]));

        let again = run(options_for(url), false);
        assert_eq!(output(&again)["message"], "applied 0 pending migration(s)");
    }

    #[test]
    fn invalid_config_exits_with_config_class() {
        let result = run(options_for("postgres://nope".to_string()), false);

        assert_eq!(result.exit_code, 2);
        assert_eq!(output(&result)["error_class"], "config_validation");
    }
}
