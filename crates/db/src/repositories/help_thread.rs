use async_trait::async_trait;
use sqlx::Row;

use helpline_core::domain::member::UserId;
use helpline_core::domain::thread::{HelpThreadRecord, ThreadId};
use helpline_core::errors::ApplicationError;
use helpline_core::ports::HelpThreadRepository;

use super::{parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlHelpThreadRepository {
    pool: DbPool,
}

impl SqlHelpThreadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn upsert_record(&self, record: &HelpThreadRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO help_thread (thread_id, author_id, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(thread_id) DO UPDATE SET
                 author_id = excluded.author_id,
                 created_at = excluded.created_at",
        )
        .bind(&record.thread_id.0)
        .bind(&record.author_id.0)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_record(
        &self,
        thread: &ThreadId,
    ) -> Result<Option<HelpThreadRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT thread_id, author_id, created_at FROM help_thread WHERE thread_id = ?",
        )
        .bind(&thread.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<HelpThreadRecord, RepositoryError> {
    let thread_id: String = row.try_get("thread_id")?;
    let author_id: String = row.try_get("author_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(HelpThreadRecord {
        thread_id: ThreadId(thread_id),
        author_id: UserId(author_id),
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait]
impl HelpThreadRepository for SqlHelpThreadRepository {
    async fn upsert(&self, record: HelpThreadRecord) -> Result<(), ApplicationError> {
        Ok(self.upsert_record(&record).await?)
    }

    async fn find_by_thread(
        &self,
        thread: &ThreadId,
    ) -> Result<Option<HelpThreadRecord>, ApplicationError> {
        Ok(self.find_record(thread).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use helpline_core::domain::member::UserId;
    use helpline_core::domain::thread::{HelpThreadRecord, ThreadId};
    use helpline_core::errors::ApplicationError;
    use helpline_core::ports::HelpThreadRepository;

    use super::SqlHelpThreadRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    fn record(thread: &str, author: &str, hour: u32) -> HelpThreadRecord {
        HelpThreadRecord {
            thread_id: ThreadId(thread.to_owned()),
            author_id: UserId(author.to_owned()),
            created_at: Utc.with_ymd_and_hms(2026, 2, 14, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn upsert_then_find_round_trips() {
        let repository = SqlHelpThreadRepository::new(pool().await);

        repository.upsert(record("T1", "asker", 9)).await.expect("upsert");

        let found = repository.find_by_thread(&ThreadId("T1".to_owned())).await.expect("find");
        assert_eq!(found, Some(record("T1", "asker", 9)));
        assert_eq!(
            repository.find_by_thread(&ThreadId("T2".to_owned())).await.expect("find"),
            None
        );
    }

    #[tokio::test]
    async fn repeated_upsert_keeps_a_single_row() {
        let pool = pool().await;
        let repository = SqlHelpThreadRepository::new(pool.clone());

        repository.upsert(record("T1", "asker", 9)).await.expect("first");
        repository.upsert(record("T1", "asker", 10)).await.expect("second");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM help_thread")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);
        let found = repository.find_by_thread(&ThreadId("T1".to_owned())).await.expect("find");
        assert_eq!(found.map(|record| record.created_at), Some(record("T1", "asker", 10).created_at));
    }

    #[tokio::test]
    async fn corrupt_timestamps_surface_as_persistence_errors() {
        let pool = pool().await;
        sqlx::query("INSERT INTO help_thread (thread_id, author_id, created_at) VALUES ('T9', 'a', 'yesterday')")
            .execute(&pool)
            .await
            .expect("insert");
        let repository = SqlHelpThreadRepository::new(pool);

        let error = repository
            .find_by_thread(&ThreadId("T9".to_owned()))
            .await
            .expect_err("decode fails");

        assert!(matches!(error, ApplicationError::Persistence(ref message) if message.contains("yesterday")));
    }
}
