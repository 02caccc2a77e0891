//! Collaborators the core talks to. Implementations live with the chat platform
//! client and the persistence layer; every call is a suspension point.

use async_trait::async_trait;

use crate::domain::label::Label;
use crate::domain::member::{Member, Role, UserId};
use crate::domain::moderation::{ModerationAction, Restriction};
use crate::domain::thread::{
    Forum, ForumId, GuildId, HelpThread, HelpThreadRecord, MessageSummary, ThreadId,
};
use crate::errors::ApplicationError;

#[async_trait]
pub trait ForumGateway: Send + Sync {
    /// Live, ordered labels of a thread. Index 0 is the highest priority.
    async fn applied_labels(&self, thread: &ThreadId) -> Result<Vec<Label>, ApplicationError>;

    /// Replaces the applied labels in one call, preserving order.
    async fn set_applied_labels(
        &self,
        thread: &ThreadId,
        labels: &[Label],
    ) -> Result<(), ApplicationError>;

    async fn available_labels(&self, forum: &ForumId) -> Result<Vec<Label>, ApplicationError>;

    async fn thread(&self, thread: &ThreadId) -> Result<Option<HelpThread>, ApplicationError>;

    async fn rename_thread(&self, thread: &ThreadId, title: &str) -> Result<(), ApplicationError>;

    async fn forums(&self, guild: &GuildId) -> Result<Vec<Forum>, ApplicationError>;

    async fn threads_in(&self, forum: &ForumId) -> Result<Vec<HelpThread>, ApplicationError>;

    async fn recent_messages(
        &self,
        thread: &ThreadId,
        limit: usize,
    ) -> Result<Vec<MessageSummary>, ApplicationError>;
}

#[async_trait]
pub trait GuildGateway: Send + Sync {
    async fn guilds(&self) -> Result<Vec<GuildId>, ApplicationError>;

    async fn guild_name(&self, guild: &GuildId) -> Result<String, ApplicationError>;

    async fn roles(&self, guild: &GuildId) -> Result<Vec<Role>, ApplicationError>;

    /// Case-insensitive role lookup by name.
    async fn find_role_by_name(
        &self,
        guild: &GuildId,
        name: &str,
    ) -> Result<Option<Role>, ApplicationError> {
        let roles = self.roles(guild).await?;
        Ok(roles.into_iter().find(|role| role.name.eq_ignore_ascii_case(name)))
    }

    async fn member(
        &self,
        guild: &GuildId,
        user: &UserId,
    ) -> Result<Option<Member>, ApplicationError>;

    /// The bot's own membership in `guild`.
    async fn self_member(&self, guild: &GuildId) -> Result<Member, ApplicationError>;

    /// Applies `restriction` to `target`, tagging the platform audit log with `reason`.
    async fn apply_restriction(
        &self,
        guild: &GuildId,
        target: &UserId,
        restriction: &Restriction,
        reason: &str,
    ) -> Result<(), ApplicationError>;
}

#[async_trait]
pub trait DirectMessenger: Send + Sync {
    async fn send_direct_message(
        &self,
        user: &UserId,
        content: &str,
    ) -> Result<(), ApplicationError>;
}

#[async_trait]
pub trait HelpThreadRepository: Send + Sync {
    async fn upsert(&self, record: HelpThreadRecord) -> Result<(), ApplicationError>;

    async fn find_by_thread(
        &self,
        thread: &ThreadId,
    ) -> Result<Option<HelpThreadRecord>, ApplicationError>;
}

#[async_trait]
pub trait ModerationActionRepository: Send + Sync {
    async fn append(&self, action: ModerationAction) -> Result<(), ApplicationError>;

    /// History of actions against `target`, oldest first.
    async fn actions_against(
        &self,
        guild: &GuildId,
        target: &UserId,
    ) -> Result<Vec<ModerationAction>, ApplicationError>;
}
