use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use helpline_db::{migrations, DbPool};
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    started_at: DateTime<Utc>,
}

impl HealthState {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool, started_at: Utc::now() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: CheckStatus,
    pub detail: String,
}

impl HealthCheck {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: CheckStatus::Ready, detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: CheckStatus::Degraded, detail: detail.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: CheckStatus,
    pub database: HealthCheck,
    pub migrations: HealthCheck,
    pub uptime_secs: i64,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, db_pool: DbPool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint listening"
    );

    let app = router(HealthState::new(db_pool));
    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint stopped unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let now = Utc::now();
    let database = database_check(&state.db_pool).await;
    let migrations = if database.status == CheckStatus::Ready {
        migration_check(&state.db_pool).await
    } else {
        HealthCheck::degraded("skipped: database unreachable")
    };

    let ready = database.status == CheckStatus::Ready && migrations.status == CheckStatus::Ready;
    let payload = HealthResponse {
        status: if ready { CheckStatus::Ready } else { CheckStatus::Degraded },
        database,
        migrations,
        uptime_secs: (now - state.started_at).num_seconds(),
        checked_at: now.to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck::ready("database query succeeded"),
        Err(error) => HealthCheck::degraded(format!("database query failed: {error}")),
    }
}

async fn migration_check(pool: &DbPool) -> HealthCheck {
    match migrations::pending_versions(pool).await {
        Ok(pending) if pending.is_empty() => HealthCheck::ready("schema up to date"),
        Ok(pending) => HealthCheck::degraded(format!("pending migrations: {pending:?}")),
        Err(error) => HealthCheck::degraded(format!("migration status unavailable: {error}")),
    }
}
