//! In-process chat platform. Keeps guilds, forums, threads and members in memory and
//! implements every collaborator port, so the bot can run end to end without a
//! network connection.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use helpline_core::domain::label::Label;
use helpline_core::domain::member::{Member, Role, UserId};
use helpline_core::domain::moderation::Restriction;
use helpline_core::domain::thread::{
    Forum, ForumId, GuildId, HelpThread, MessageSummary, ThreadId,
};
use helpline_core::errors::ApplicationError;
use helpline_core::ports::{DirectMessenger, ForumGateway, GuildGateway};

use crate::blocks::MessageTemplate;

/// Posts bot messages into a thread.
#[async_trait]
pub trait ThreadMessenger: Send + Sync {
    async fn post_message(
        &self,
        thread: &ThreadId,
        message: &MessageTemplate,
    ) -> Result<(), ApplicationError>;
}

#[derive(Clone, Debug)]
struct GuildRecord {
    name: String,
    roles: Vec<Role>,
    members: HashMap<UserId, Member>,
    bot: Member,
    banned: HashSet<UserId>,
}

#[derive(Default)]
struct PlatformState {
    guilds: HashMap<GuildId, GuildRecord>,
    forums: Vec<Forum>,
    forum_labels: HashMap<ForumId, Vec<Label>>,
    threads: HashMap<ThreadId, HelpThread>,
    applied: HashMap<ThreadId, Vec<Label>>,
    messages: HashMap<ThreadId, Vec<MessageSummary>>,
    posted: Vec<(ThreadId, MessageTemplate)>,
    direct_messages: Vec<(UserId, String)>,
    closed_direct_messages: HashSet<UserId>,
}

#[derive(Default)]
pub struct InMemoryPlatform {
    state: RwLock<PlatformState>,
}

fn unknown(kind: &str, id: &str) -> ApplicationError {
    ApplicationError::Integration(format!("unknown {kind} {id}"))
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_guild(&self, guild: GuildId, name: impl Into<String>, bot: Member) {
        let mut state = self.state.write().await;
        state.guilds.insert(
            guild,
            GuildRecord {
                name: name.into(),
                roles: bot.roles.clone(),
                members: HashMap::new(),
                bot,
                banned: HashSet::new(),
            },
        );
    }

    pub async fn add_role(&self, guild: &GuildId, role: Role) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        let record = state.guilds.get_mut(guild).ok_or_else(|| unknown("guild", &guild.0))?;
        record.roles.push(role);
        Ok(())
    }

    pub async fn add_member(&self, guild: &GuildId, member: Member) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        let record = state.guilds.get_mut(guild).ok_or_else(|| unknown("guild", &guild.0))?;
        record.members.insert(member.user_id.clone(), member);
        Ok(())
    }

    /// Registers a forum offering labels with the given names.
    pub async fn add_forum(&self, forum: Forum, label_names: &[&str]) {
        let mut state = self.state.write().await;
        let labels = label_names
            .iter()
            .enumerate()
            .map(|(index, name)| Label::new(format!("{}-tag-{index}", forum.id.0), *name))
            .collect();
        state.forum_labels.insert(forum.id.clone(), labels);
        state.forums.push(forum);
    }

    /// Opens a thread carrying the forum labels named in `applied`, in that order.
    pub async fn open_thread(
        &self,
        thread: HelpThread,
        applied: &[&str],
    ) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        let available =
            state.forum_labels.get(&thread.forum_id).ok_or_else(|| unknown("forum", &thread.forum_id.0))?;
        let labels = applied
            .iter()
            .map(|name| {
                available
                    .iter()
                    .find(|label| label.name == *name)
                    .cloned()
                    .ok_or_else(|| unknown("label", name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        state.applied.insert(thread.id.clone(), labels);
        state.threads.insert(thread.id.clone(), thread);
        Ok(())
    }

    pub async fn record_message(&self, thread: &ThreadId, message: MessageSummary) {
        self.state.write().await.messages.entry(thread.clone()).or_default().push(message);
    }

    pub async fn close_direct_messages(&self, user: UserId) {
        self.state.write().await.closed_direct_messages.insert(user);
    }

    pub async fn applied_label_names(&self, thread: &ThreadId) -> Vec<String> {
        let state = self.state.read().await;
        state
            .applied
            .get(thread)
            .map(|labels| labels.iter().map(|label| label.name.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn posted_messages(&self, thread: &ThreadId) -> Vec<MessageTemplate> {
        let state = self.state.read().await;
        state
            .posted
            .iter()
            .filter(|(target, _)| target == thread)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub async fn direct_messages(&self, user: &UserId) -> Vec<String> {
        let state = self.state.read().await;
        state
            .direct_messages
            .iter()
            .filter(|(recipient, _)| recipient == user)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub async fn is_banned(&self, guild: &GuildId, user: &UserId) -> bool {
        let state = self.state.read().await;
        state.guilds.get(guild).is_some_and(|record| record.banned.contains(user))
    }
}

#[async_trait]
impl ForumGateway for InMemoryPlatform {
    async fn applied_labels(&self, thread: &ThreadId) -> Result<Vec<Label>, ApplicationError> {
        let state = self.state.read().await;
        state.applied.get(thread).cloned().ok_or_else(|| unknown("thread", &thread.0))
    }

    async fn set_applied_labels(
        &self,
        thread: &ThreadId,
        labels: &[Label],
    ) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        let applied = state.applied.get_mut(thread).ok_or_else(|| unknown("thread", &thread.0))?;
        *applied = labels.to_vec();
        Ok(())
    }

    async fn available_labels(&self, forum: &ForumId) -> Result<Vec<Label>, ApplicationError> {
        let state = self.state.read().await;
        state.forum_labels.get(forum).cloned().ok_or_else(|| unknown("forum", &forum.0))
    }

    async fn thread(&self, thread: &ThreadId) -> Result<Option<HelpThread>, ApplicationError> {
        Ok(self.state.read().await.threads.get(thread).cloned())
    }

    async fn rename_thread(&self, thread: &ThreadId, title: &str) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        let existing = state.threads.get_mut(thread).ok_or_else(|| unknown("thread", &thread.0))?;
        existing.title = title.to_owned();
        Ok(())
    }

    async fn forums(&self, guild: &GuildId) -> Result<Vec<Forum>, ApplicationError> {
        let state = self.state.read().await;
        Ok(state.forums.iter().filter(|forum| &forum.guild_id == guild).cloned().collect())
    }

    async fn threads_in(&self, forum: &ForumId) -> Result<Vec<HelpThread>, ApplicationError> {
        let state = self.state.read().await;
        let mut threads: Vec<HelpThread> =
            state.threads.values().filter(|thread| &thread.forum_id == forum).cloned().collect();
        threads.sort_by_key(|thread| thread.created_at);
        Ok(threads)
    }

    async fn recent_messages(
        &self,
        thread: &ThreadId,
        limit: usize,
    ) -> Result<Vec<MessageSummary>, ApplicationError> {
        let state = self.state.read().await;
        let messages = state.messages.get(thread).map(Vec::as_slice).unwrap_or_default();
        Ok(messages.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl GuildGateway for InMemoryPlatform {
    async fn guilds(&self) -> Result<Vec<GuildId>, ApplicationError> {
        let state = self.state.read().await;
        let mut guilds: Vec<GuildId> = state.guilds.keys().cloned().collect();
        guilds.sort_by(|left, right| left.0.cmp(&right.0));
        Ok(guilds)
    }

    async fn guild_name(&self, guild: &GuildId) -> Result<String, ApplicationError> {
        let state = self.state.read().await;
        state.guilds.get(guild).map(|record| record.name.clone()).ok_or_else(|| unknown("guild", &guild.0))
    }

    async fn roles(&self, guild: &GuildId) -> Result<Vec<Role>, ApplicationError> {
        let state = self.state.read().await;
        state.guilds.get(guild).map(|record| record.roles.clone()).ok_or_else(|| unknown("guild", &guild.0))
    }

    async fn member(
        &self,
        guild: &GuildId,
        user: &UserId,
    ) -> Result<Option<Member>, ApplicationError> {
        let state = self.state.read().await;
        let record = state.guilds.get(guild).ok_or_else(|| unknown("guild", &guild.0))?;
        Ok(record.members.get(user).cloned())
    }

    async fn self_member(&self, guild: &GuildId) -> Result<Member, ApplicationError> {
        let state = self.state.read().await;
        state.guilds.get(guild).map(|record| record.bot.clone()).ok_or_else(|| unknown("guild", &guild.0))
    }

    async fn apply_restriction(
        &self,
        guild: &GuildId,
        target: &UserId,
        restriction: &Restriction,
        _reason: &str,
    ) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        let record = state.guilds.get_mut(guild).ok_or_else(|| unknown("guild", &guild.0))?;

        match restriction {
            Restriction::AssignRole(role) => {
                let member =
                    record.members.get_mut(target).ok_or_else(|| unknown("member", &target.0))?;
                if !member.roles.iter().any(|held| held.id == role.id) {
                    member.roles.push(role.clone());
                }
            }
            Restriction::Kick => {
                record.members.remove(target).ok_or_else(|| unknown("member", &target.0))?;
            }
            Restriction::Ban => {
                record.members.remove(target);
                record.banned.insert(target.clone());
            }
            Restriction::RecordOnly => {}
        }

        Ok(())
    }
}

#[async_trait]
impl DirectMessenger for InMemoryPlatform {
    async fn send_direct_message(
        &self,
        user: &UserId,
        content: &str,
    ) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        if state.closed_direct_messages.contains(user) {
            return Err(ApplicationError::Integration(format!(
                "user {} does not accept direct messages",
                user.0
            )));
        }
        state.direct_messages.push((user.clone(), content.to_owned()));
        Ok(())
    }
}

#[async_trait]
impl ThreadMessenger for InMemoryPlatform {
    async fn post_message(
        &self,
        thread: &ThreadId,
        message: &MessageTemplate,
    ) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        if !state.threads.contains_key(thread) {
            return Err(unknown("thread", &thread.0));
        }
        state.posted.push((thread.clone(), message.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use helpline_core::domain::member::{Member, Role, RoleId, UserId};
    use helpline_core::domain::moderation::Restriction;
    use helpline_core::domain::thread::{Forum, ForumId, GuildId, HelpThread, MessageSummary, ThreadId};
    use helpline_core::errors::ApplicationError;
    use helpline_core::ports::{DirectMessenger, ForumGateway, GuildGateway};

    use super::InMemoryPlatform;

    fn guild() -> GuildId {
        GuildId("G1".to_owned())
    }

    fn user(id: &str) -> Member {
        Member { user_id: UserId(id.to_owned()), display_name: id.to_owned(), roles: vec![], is_owner: false }
    }

    async fn platform() -> InMemoryPlatform {
        let platform = InMemoryPlatform::new();
        platform.add_guild(guild(), "Guild", user("bot")).await;
        platform
            .add_forum(
                Forum { id: ForumId("F1".to_owned()), guild_id: guild(), name: "questions".to_owned() },
                &["Java", "Active"],
            )
            .await;
        platform
            .open_thread(
                HelpThread {
                    id: ThreadId("T1".to_owned()),
                    guild_id: guild(),
                    forum_id: ForumId("F1".to_owned()),
                    forum_name: "questions".to_owned(),
                    title: "Help".to_owned(),
                    author_id: UserId("asker".to_owned()),
                    archived: false,
                    created_at: Utc::now(),
                },
                &["Java"],
            )
            .await
            .expect("open thread");
        platform
    }

    #[tokio::test]
    async fn opened_threads_expose_forum_labels() {
        let platform = platform().await;

        let applied = platform.applied_labels(&ThreadId("T1".to_owned())).await.expect("labels");
        let available = platform.available_labels(&ForumId("F1".to_owned())).await.expect("catalog");

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0], available[0]);
    }

    #[tokio::test]
    async fn recent_messages_are_newest_first_and_limited() {
        let platform = platform().await;
        let thread = ThreadId("T1".to_owned());
        for author in ["a", "b", "c"] {
            platform
                .record_message(&thread, MessageSummary { author_id: UserId(author.to_owned()), author_is_bot: false })
                .await;
        }

        let recent = platform.recent_messages(&thread, 2).await.expect("messages");

        let authors: Vec<&str> = recent.iter().map(|message| message.author_id.0.as_str()).collect();
        assert_eq!(authors, ["c", "b"]);
    }

    #[tokio::test]
    async fn restrictions_change_membership() {
        let platform = platform().await;
        let muted = Role { id: RoleId("r-muted".to_owned()), name: "Muted".to_owned(), position: 1 };
        platform.add_member(&guild(), user("duke")).await.expect("member");
        platform.add_member(&guild(), user("earl")).await.expect("member");

        platform
            .apply_restriction(&guild(), &UserId("duke".to_owned()), &Restriction::AssignRole(muted), "spam")
            .await
            .expect("mute");
        platform
            .apply_restriction(&guild(), &UserId("earl".to_owned()), &Restriction::Ban, "spam")
            .await
            .expect("ban");

        let duke = platform.member(&guild(), &UserId("duke".to_owned())).await.expect("lookup");
        assert_eq!(duke.map(|member| member.roles.len()), Some(1));
        assert!(platform.is_banned(&guild(), &UserId("earl".to_owned())).await);
        assert_eq!(platform.member(&guild(), &UserId("earl".to_owned())).await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn closed_direct_messages_fail() {
        let platform = platform().await;
        platform.close_direct_messages(UserId("duke".to_owned())).await;

        let error = platform
            .send_direct_message(&UserId("duke".to_owned()), "hi")
            .await
            .expect_err("closed");

        assert!(matches!(error, ApplicationError::Integration(_)));
    }
}
