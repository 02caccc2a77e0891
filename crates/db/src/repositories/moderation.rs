use async_trait::async_trait;
use sqlx::Row;

use helpline_core::domain::member::UserId;
use helpline_core::domain::moderation::{ActionId, ActionKind, ModerationAction};
use helpline_core::domain::thread::GuildId;
use helpline_core::errors::ApplicationError;
use helpline_core::ports::ModerationActionRepository;

use super::{parse_timestamp, RepositoryError};
use crate::DbPool;

/// Append-only audit trail of issued moderation actions.
pub struct SqlModerationActionRepository {
    pool: DbPool,
}

impl SqlModerationActionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, action: &ModerationAction) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO moderation_action
                 (id, guild_id, actor_id, target_id, kind, issued_at, expires_at, reason)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&action.id.0)
        .bind(&action.guild_id.0)
        .bind(&action.actor_id.0)
        .bind(&action.target_id.0)
        .bind(action.kind.as_str())
        .bind(action.issued_at.to_rfc3339())
        .bind(action.expires_at.map(|expires_at| expires_at.to_rfc3339()))
        .bind(&action.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn select_against(
        &self,
        guild: &GuildId,
        target: &UserId,
    ) -> Result<Vec<ModerationAction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, guild_id, actor_id, target_id, kind, issued_at, expires_at, reason
             FROM moderation_action
             WHERE guild_id = ? AND target_id = ?
             ORDER BY issued_at ASC, rowid ASC",
        )
        .bind(&guild.0)
        .bind(&target.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_action).collect()
    }
}

fn row_to_action(row: &sqlx::sqlite::SqliteRow) -> Result<ModerationAction, RepositoryError> {
    let kind: String = row.try_get("kind")?;
    let issued_at: String = row.try_get("issued_at")?;
    let expires_at: Option<String> = row.try_get("expires_at")?;

    Ok(ModerationAction {
        id: ActionId(row.try_get("id")?),
        guild_id: GuildId(row.try_get("guild_id")?),
        actor_id: UserId(row.try_get("actor_id")?),
        target_id: UserId(row.try_get("target_id")?),
        kind: kind.parse::<ActionKind>().map_err(RepositoryError::Decode)?,
        issued_at: parse_timestamp("issued_at", &issued_at)?,
        expires_at: expires_at
            .as_deref()
            .map(|value| parse_timestamp("expires_at", value))
            .transpose()?,
        reason: row.try_get("reason")?,
    })
}

#[async_trait]
impl ModerationActionRepository for SqlModerationActionRepository {
    async fn append(&self, action: ModerationAction) -> Result<(), ApplicationError> {
        Ok(self.insert(&action).await?)
    }

    async fn actions_against(
        &self,
        guild: &GuildId,
        target: &UserId,
    ) -> Result<Vec<ModerationAction>, ApplicationError> {
        Ok(self.select_against(guild, target).await?)
    }
}
