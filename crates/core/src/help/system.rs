use std::sync::Arc;

use regex::Regex;
use tracing::{info, warn};

use crate::config::{full_match_regex, HelpSystemConfig};
use crate::domain::member::Role;
use crate::domain::thread::{Forum, ForumId, GuildId, HelpThread, HelpThreadRecord};
use crate::errors::ApplicationError;
use crate::ports::{ForumGateway, GuildGateway, HelpThreadRepository};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TitleChange {
    Unchanged,
    Renamed,
}

/// Glue around the help forums: which containers qualify, helper roles, thread
/// bookkeeping.
pub struct HelpSystem {
    config: HelpSystemConfig,
    forum_name_matcher: Regex,
    forums: Arc<dyn ForumGateway>,
    guilds: Arc<dyn GuildGateway>,
    threads: Arc<dyn HelpThreadRepository>,
}

impl HelpSystem {
    pub fn new(
        config: HelpSystemConfig,
        forums: Arc<dyn ForumGateway>,
        guilds: Arc<dyn GuildGateway>,
        threads: Arc<dyn HelpThreadRepository>,
    ) -> Result<Self, ApplicationError> {
        let forum_name_matcher = full_match_regex(&config.forum_pattern).map_err(|error| {
            ApplicationError::Configuration(format!("invalid help forum pattern: {error}"))
        })?;

        Ok(Self { config, forum_name_matcher, forums, guilds, threads })
    }

    pub fn config(&self) -> &HelpSystemConfig {
        &self.config
    }

    pub fn forum_pattern(&self) -> &str {
        &self.config.forum_pattern
    }

    pub fn is_help_forum_name(&self, name: &str) -> bool {
        self.forum_name_matcher.is_match(name)
    }

    pub fn is_help_thread(&self, thread: &HelpThread) -> bool {
        self.is_help_forum_name(&thread.forum_name)
    }

    pub async fn help_forums(&self, guild: &GuildId) -> Result<Vec<Forum>, ApplicationError> {
        let forums = self.forums.forums(guild).await?;
        Ok(forums.into_iter().filter(|forum| self.is_help_forum_name(&forum.name)).collect())
    }

    pub async fn require_help_forum(&self, guild: &GuildId) -> Result<Forum, ApplicationError> {
        self.help_forums(guild).await?.into_iter().next().ok_or_else(|| {
            warn!(
                event_name = "help.forum.missing",
                guild_id = %guild.0,
                pattern = %self.config.forum_pattern,
                "no forum matches the help forum pattern"
            );
            ApplicationError::Configuration(format!(
                "no help forum matching `{}` exists in guild {}",
                self.config.forum_pattern, guild.0
            ))
        })
    }

    /// The helper role pinged for a category, named `<category><suffix>`.
    pub async fn find_role_for_category(
        &self,
        guild: &GuildId,
        category: &str,
    ) -> Result<Option<Role>, ApplicationError> {
        let role_name = format!("{category}{}", self.config.category_role_suffix);
        let role = self.guilds.find_role_by_name(guild, &role_name).await?;

        if role.is_none() {
            warn!(
                event_name = "help.helper_role.missing",
                guild_id = %guild.0,
                role_name = %role_name,
                "unable to find the helper role"
            );
        }

        Ok(role)
    }

    pub async fn record_thread_creation(&self, thread: &HelpThread) -> Result<(), ApplicationError> {
        self.threads.upsert(HelpThreadRecord::from(thread)).await?;
        info!(
            event_name = "help.thread.recorded",
            guild_id = %thread.guild_id.0,
            thread_id = %thread.id.0,
            author_id = %thread.author_id.0,
            "help thread creation recorded"
        );
        Ok(())
    }

    pub async fn active_threads_in(
        &self,
        forum: &ForumId,
    ) -> Result<Vec<HelpThread>, ApplicationError> {
        let threads = self.forums.threads_in(forum).await?;
        Ok(threads.into_iter().filter(|thread| !thread.archived).collect())
    }

    pub async fn rename_thread(
        &self,
        thread: &HelpThread,
        title: &str,
    ) -> Result<TitleChange, ApplicationError> {
        if thread.title == title {
            return Ok(TitleChange::Unchanged);
        }

        self.forums.rename_thread(&thread.id, title).await?;
        Ok(TitleChange::Renamed)
    }
}
