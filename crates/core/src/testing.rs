//! Scripted collaborators shared by the unit tests of this crate.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;

use crate::domain::label::Label;
use crate::domain::member::{Member, Role, RoleId, UserId};
use crate::domain::moderation::{ModerationAction, Restriction};
use crate::domain::thread::{
    Forum, ForumId, GuildId, HelpThread, HelpThreadRecord, MessageSummary, ThreadId,
};
use crate::errors::ApplicationError;
use crate::ports::{
    DirectMessenger, ForumGateway, GuildGateway, HelpThreadRepository, ModerationActionRepository,
};

pub const GUILD: &str = "G1";
pub const FORUM: &str = "F1";

pub fn label(name: &str) -> Label {
    Label::new(format!("tag-{}", name.to_ascii_lowercase().replace(' ', "-")), name)
}

pub fn help_thread(id: &str, author: &str) -> HelpThread {
    HelpThread {
        id: ThreadId(id.to_owned()),
        guild_id: GuildId(GUILD.to_owned()),
        forum_id: ForumId(FORUM.to_owned()),
        forum_name: "questions".to_owned(),
        title: format!("thread {id}"),
        author_id: UserId(author.to_owned()),
        archived: false,
        created_at: Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap(),
    }
}

pub fn role(name: &str, position: i32) -> Role {
    Role { id: RoleId(format!("role-{}", name.to_ascii_lowercase())), name: name.to_owned(), position }
}

pub fn member(id: &str, roles: Vec<Role>) -> Member {
    Member { user_id: UserId(id.to_owned()), display_name: id.to_owned(), roles, is_owner: false }
}

#[derive(Default)]
pub struct ScriptedForum {
    pub state: Mutex<ForumState>,
}

#[derive(Default)]
pub struct ForumState {
    pub forums: Vec<Forum>,
    pub available: HashMap<ForumId, Vec<Label>>,
    pub threads: HashMap<ThreadId, HelpThread>,
    pub applied: HashMap<ThreadId, Vec<Label>>,
    pub messages: HashMap<ThreadId, Vec<MessageSummary>>,
    pub label_reads: usize,
    pub label_writes: usize,
    pub catalog_reads: usize,
    pub renames: Vec<(ThreadId, String)>,
    pub fail_writes: bool,
}

impl ScriptedForum {
    pub fn with_forum(available: &[&str]) -> Self {
        let forum_id = ForumId(FORUM.to_owned());
        let mut state = ForumState::default();
        state.forums.push(Forum {
            id: forum_id.clone(),
            guild_id: GuildId(GUILD.to_owned()),
            name: "questions".to_owned(),
        });
        state.available.insert(forum_id, available.iter().map(|name| label(name)).collect());
        Self { state: Mutex::new(state) }
    }

    pub async fn add_thread(&self, thread: HelpThread, applied: &[&str]) {
        let mut state = self.state.lock().await;
        state.applied.insert(thread.id.clone(), applied.iter().map(|name| label(name)).collect());
        state.threads.insert(thread.id.clone(), thread);
    }

    pub async fn applied_names(&self, thread: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .applied
            .get(&ThreadId(thread.to_owned()))
            .map(|labels| labels.iter().map(|label| label.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ForumGateway for ScriptedForum {
    async fn applied_labels(&self, thread: &ThreadId) -> Result<Vec<Label>, ApplicationError> {
        let mut state = self.state.lock().await;
        state.label_reads += 1;
        Ok(state.applied.get(thread).cloned().unwrap_or_default())
    }

    async fn set_applied_labels(
        &self,
        thread: &ThreadId,
        labels: &[Label],
    ) -> Result<(), ApplicationError> {
        let mut state = self.state.lock().await;
        if state.fail_writes {
            return Err(ApplicationError::Integration("rate limited".to_owned()));
        }
        state.label_writes += 1;
        state.applied.insert(thread.clone(), labels.to_vec());
        Ok(())
    }

    async fn available_labels(&self, forum: &ForumId) -> Result<Vec<Label>, ApplicationError> {
        let mut state = self.state.lock().await;
        state.catalog_reads += 1;
        Ok(state.available.get(forum).cloned().unwrap_or_default())
    }

    async fn thread(&self, thread: &ThreadId) -> Result<Option<HelpThread>, ApplicationError> {
        Ok(self.state.lock().await.threads.get(thread).cloned())
    }

    async fn rename_thread(&self, thread: &ThreadId, title: &str) -> Result<(), ApplicationError> {
        let mut state = self.state.lock().await;
        state.renames.push((thread.clone(), title.to_owned()));
        if let Some(existing) = state.threads.get_mut(thread) {
            existing.title = title.to_owned();
        }
        Ok(())
    }

    async fn forums(&self, guild: &GuildId) -> Result<Vec<Forum>, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.forums.iter().filter(|forum| &forum.guild_id == guild).cloned().collect())
    }

    async fn threads_in(&self, forum: &ForumId) -> Result<Vec<HelpThread>, ApplicationError> {
        let state = self.state.lock().await;
        let mut threads: Vec<HelpThread> =
            state.threads.values().filter(|thread| &thread.forum_id == forum).cloned().collect();
        threads.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        Ok(threads)
    }

    async fn recent_messages(
        &self,
        thread: &ThreadId,
        limit: usize,
    ) -> Result<Vec<MessageSummary>, ApplicationError> {
        let state = self.state.lock().await;
        let messages = state.messages.get(thread).cloned().unwrap_or_default();
        Ok(messages.into_iter().rev().take(limit).collect())
    }
}

#[derive(Default)]
pub struct ScriptedGuild {
    pub state: Mutex<GuildState>,
}

#[derive(Default)]
pub struct GuildState {
    pub name: String,
    pub roles: Vec<Role>,
    pub members: HashMap<UserId, Member>,
    pub bot: Option<Member>,
    pub applied: Vec<(UserId, Restriction, String)>,
    pub fail_restrictions: bool,
}

impl ScriptedGuild {
    pub fn new(roles: Vec<Role>, bot: Member, members: Vec<Member>) -> Self {
        Self {
            state: Mutex::new(GuildState {
                name: "Helpline Test Guild".to_owned(),
                roles,
                members: members
                    .into_iter()
                    .map(|member| (member.user_id.clone(), member))
                    .collect(),
                bot: Some(bot),
                ..GuildState::default()
            }),
        }
    }
}

#[async_trait]
impl GuildGateway for ScriptedGuild {
    async fn guilds(&self) -> Result<Vec<GuildId>, ApplicationError> {
        Ok(vec![GuildId(GUILD.to_owned())])
    }

    async fn guild_name(&self, _guild: &GuildId) -> Result<String, ApplicationError> {
        Ok(self.state.lock().await.name.clone())
    }

    async fn roles(&self, _guild: &GuildId) -> Result<Vec<Role>, ApplicationError> {
        Ok(self.state.lock().await.roles.clone())
    }

    async fn member(
        &self,
        _guild: &GuildId,
        user: &UserId,
    ) -> Result<Option<Member>, ApplicationError> {
        Ok(self.state.lock().await.members.get(user).cloned())
    }

    async fn self_member(&self, _guild: &GuildId) -> Result<Member, ApplicationError> {
        self.state
            .lock()
            .await
            .bot
            .clone()
            .ok_or_else(|| ApplicationError::Integration("bot is not a member".to_owned()))
    }

    async fn apply_restriction(
        &self,
        _guild: &GuildId,
        target: &UserId,
        restriction: &Restriction,
        reason: &str,
    ) -> Result<(), ApplicationError> {
        let mut state = self.state.lock().await;
        if state.fail_restrictions {
            return Err(ApplicationError::Integration("missing permissions".to_owned()));
        }
        state.applied.push((target.clone(), restriction.clone(), reason.to_owned()));
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedMessenger {
    pub fail: bool,
    pub sent: Mutex<Vec<(UserId, String)>>,
}

#[async_trait]
impl DirectMessenger for ScriptedMessenger {
    async fn send_direct_message(
        &self,
        user: &UserId,
        content: &str,
    ) -> Result<(), ApplicationError> {
        if self.fail {
            return Err(ApplicationError::Integration("user does not accept DMs".to_owned()));
        }
        self.sent.lock().await.push((user.clone(), content.to_owned()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub threads: Mutex<HashMap<ThreadId, HelpThreadRecord>>,
    pub actions: Mutex<Vec<ModerationAction>>,
}

#[async_trait]
impl HelpThreadRepository for RecordingStore {
    async fn upsert(&self, record: HelpThreadRecord) -> Result<(), ApplicationError> {
        self.threads.lock().await.insert(record.thread_id.clone(), record);
        Ok(())
    }

    async fn find_by_thread(
        &self,
        thread: &ThreadId,
    ) -> Result<Option<HelpThreadRecord>, ApplicationError> {
        Ok(self.threads.lock().await.get(thread).cloned())
    }
}

#[async_trait]
impl ModerationActionRepository for RecordingStore {
    async fn append(&self, action: ModerationAction) -> Result<(), ApplicationError> {
        self.actions.lock().await.push(action);
        Ok(())
    }

    async fn actions_against(
        &self,
        guild: &GuildId,
        target: &UserId,
    ) -> Result<Vec<ModerationAction>, ApplicationError> {
        let actions = self.actions.lock().await;
        Ok(actions
            .iter()
            .filter(|action| &action.guild_id == guild && &action.target_id == target)
            .cloned()
            .collect())
    }
}
