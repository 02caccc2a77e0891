use helpline_core::config::{AppConfig, LoadOptions};
use helpline_core::help::TagCatalog;
use helpline_core::moderation::ModerationPolicy;
use helpline_db::{connect_with_settings, migrations};
use serde::Serialize;

use crate::commands::{escape_json, runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_help_system(&config));
            checks.push(check_moderation(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["help_system", "moderation_roles", "database_connectivity", "schema_migrations"]
            {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_help_system(config: &AppConfig) -> DoctorCheck {
    let help = &config.help_system;
    match TagCatalog::from_config(help) {
        Ok(_) => DoctorCheck::pass(
            "help_system",
            format!(
                "forums matching `{}`, {} categories, at most {} labels per thread",
                help.forum_pattern,
                help.categories.len(),
                help.max_tags_per_thread
            ),
        ),
        Err(error) => DoctorCheck::fail("help_system", error.to_string()),
    }
}

fn check_moderation(config: &AppConfig) -> DoctorCheck {
    match ModerationPolicy::from_config(&config.moderation) {
        Ok(_) => DoctorCheck::pass(
            "moderation_roles",
            format!(
                "mute role `{}`, quarantine role `{}`",
                config.moderation.muted_role_pattern, config.moderation.quarantined_role_pattern
            ),
        ),
        Err(error) => DoctorCheck::fail("moderation_roles", error.to_string()),
    }
}

fn check_database(config: &AppConfig) -> [DoctorCheck; 2] {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return [
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to initialize async runtime: {error}"),
                ),
                DoctorCheck::skipped("schema_migrations", "no async runtime"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return [
                    DoctorCheck::fail(
                        "database_connectivity",
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::skipped("schema_migrations", "the database is unreachable"),
                ];
            }
        };

        let connectivity = DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        );
        let schema = match migrations::pending_versions(&pool).await {
            Ok(pending) if pending.is_empty() => {
                DoctorCheck::pass("schema_migrations", "all migrations applied")
            }
            Ok(pending) => DoctorCheck::fail(
                "schema_migrations",
                format!("pending migrations {pending:?}; run `helpline migrate`"),
            ),
            Err(error) => DoctorCheck::fail(
                "schema_migrations",
                format!("could not read migration status: {error}"),
            ),
        };
        pool.close().await;

        [connectivity, schema]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
