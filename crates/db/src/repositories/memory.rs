use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use helpline_core::domain::member::UserId;
use helpline_core::domain::moderation::ModerationAction;
use helpline_core::domain::thread::{GuildId, HelpThreadRecord, ThreadId};
use helpline_core::errors::ApplicationError;
use helpline_core::ports::{HelpThreadRepository, ModerationActionRepository};

#[derive(Default)]
pub struct InMemoryHelpThreadRepository {
    threads: RwLock<HashMap<String, HelpThreadRecord>>,
}

#[async_trait]
impl HelpThreadRepository for InMemoryHelpThreadRepository {
    async fn upsert(&self, record: HelpThreadRecord) -> Result<(), ApplicationError> {
        let mut threads = self.threads.write().await;
        threads.insert(record.thread_id.0.clone(), record);
        Ok(())
    }

    async fn find_by_thread(
        &self,
        thread: &ThreadId,
    ) -> Result<Option<HelpThreadRecord>, ApplicationError> {
        let threads = self.threads.read().await;
        Ok(threads.get(&thread.0).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryModerationActionRepository {
    actions: RwLock<Vec<ModerationAction>>,
}

#[async_trait]
impl ModerationActionRepository for InMemoryModerationActionRepository {
    async fn append(&self, action: ModerationAction) -> Result<(), ApplicationError> {
        let mut actions = self.actions.write().await;
        if actions.iter().any(|existing| existing.id == action.id) {
            return Err(ApplicationError::Persistence(format!(
                "moderation action {} already recorded",
                action.id.0
            )));
        }
        actions.push(action);
        Ok(())
    }

    async fn actions_against(
        &self,
        guild: &GuildId,
        target: &UserId,
    ) -> Result<Vec<ModerationAction>, ApplicationError> {
        let actions = self.actions.read().await;
        let mut history: Vec<ModerationAction> = actions
            .iter()
            .filter(|action| &action.guild_id == guild && &action.target_id == target)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        history.sort_by_key(|action| action.issued_at);
        Ok(history)
    }
}
