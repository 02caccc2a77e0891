use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::member::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForumId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

/// A thread container ("forum") that owns the catalog of labels its threads may carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    pub id: ForumId,
    pub guild_id: GuildId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpThread {
    pub id: ThreadId,
    pub guild_id: GuildId,
    pub forum_id: ForumId,
    pub forum_name: String,
    pub title: String,
    pub author_id: UserId,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

/// Persisted association between a help thread and the user who opened it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpThreadRecord {
    pub thread_id: ThreadId,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<&HelpThread> for HelpThreadRecord {
    fn from(thread: &HelpThread) -> Self {
        Self {
            thread_id: thread.id.clone(),
            author_id: thread.author_id.clone(),
            created_at: thread.created_at,
        }
    }
}

/// Minimal view of a message in a thread, enough to judge who is participating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub author_id: UserId,
    pub author_is_bot: bool,
}
