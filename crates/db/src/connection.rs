use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

/// Opens the bot's database, creating the file on first start.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use super::connect_with_settings;

    #[tokio::test]
    async fn in_memory_database_accepts_queries() {
        let pool = connect_with_settings("sqlite::memory:", 1, 1).await.expect("connect");

        let value: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.expect("select");

        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn missing_database_file_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("helpline.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect_with_settings(&url, 1, 1).await.expect("connect");
        pool.close().await;

        assert!(path.exists());
    }
}
