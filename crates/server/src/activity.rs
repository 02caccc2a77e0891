use std::sync::Arc;
use std::time::Duration;

use helpline_chat::service::HelplineServices;
use helpline_core::config::HelpSystemConfig;
use helpline_core::domain::thread::HelpThread;
use helpline_core::errors::ApplicationError;
use helpline_core::help::{determine_activity, CategorizationOutcome};
use helpline_core::ports::GuildGateway;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActivitySweep {
    pub examined: usize,
    pub relabelled: usize,
    pub failed: usize,
}

/// Periodically re-labels every open help thread with its current activity level.
pub struct ActivityUpdater {
    services: Arc<HelplineServices>,
    guilds: Arc<dyn GuildGateway>,
    history_limit: usize,
    high_threshold: usize,
}

impl ActivityUpdater {
    pub fn new(
        services: Arc<HelplineServices>,
        guilds: Arc<dyn GuildGateway>,
        config: &HelpSystemConfig,
    ) -> Self {
        Self {
            services,
            guilds,
            history_limit: config.activity_history_limit,
            high_threshold: config.activity_high_threshold,
        }
    }

    /// One pass over all guilds. Failures are logged per thread and never stop the pass.
    pub async fn sweep(&self) -> ActivitySweep {
        let mut sweep = ActivitySweep::default();

        let guilds = match self.guilds.guilds().await {
            Ok(guilds) => guilds,
            Err(error) => {
                warn!(event_name = "help.activity.guilds_failed", error = %error, "could not list guilds");
                return sweep;
            }
        };

        for guild in guilds {
            let forums = match self.services.help.help_forums(&guild).await {
                Ok(forums) => forums,
                Err(error) => {
                    warn!(
                        event_name = "help.activity.forums_failed",
                        guild_id = %guild.0,
                        error = %error,
                        "could not list help forums"
                    );
                    continue;
                }
            };

            for forum in forums {
                let threads = match self.services.help.active_threads_in(&forum.id).await {
                    Ok(threads) => threads,
                    Err(error) => {
                        warn!(
                            event_name = "help.activity.threads_failed",
                            guild_id = %guild.0,
                            forum_id = %forum.id.0,
                            error = %error,
                            "could not list help threads"
                        );
                        continue;
                    }
                };

                for thread in threads {
                    sweep.examined += 1;
                    match self.update_thread(&thread).await {
                        Ok(true) => sweep.relabelled += 1,
                        Ok(false) => {}
                        Err(error) => {
                            sweep.failed += 1;
                            warn!(
                                event_name = "help.activity.update_failed",
                                guild_id = %guild.0,
                                thread_id = %thread.id.0,
                                error = %error,
                                "thread activity update failed"
                            );
                        }
                    }
                }
            }
        }

        info!(
            event_name = "help.activity.swept",
            examined = sweep.examined,
            relabelled = sweep.relabelled,
            failed = sweep.failed,
            "activity sweep finished"
        );
        sweep
    }

    async fn update_thread(&self, thread: &HelpThread) -> Result<bool, ApplicationError> {
        let history = self.services.forums.recent_messages(&thread.id, self.history_limit).await?;
        let activity = determine_activity(&thread.author_id, &history, self.high_threshold);
        let outcome = self.services.categorization.set_activity(thread, activity).await?;
        Ok(matches!(outcome, CategorizationOutcome::Applied { .. }))
    }

    /// Runs a sweep right away and then once per `period`, until the task is aborted.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use helpline_chat::platform::InMemoryPlatform;
    use helpline_chat::service::HelplineServices;
    use helpline_core::config::{HelpSystemConfig, ModerationConfig};
    use helpline_core::domain::member::{Member, Role, RoleId, UserId};
    use helpline_core::domain::thread::{Forum, ForumId, GuildId, HelpThread, MessageSummary, ThreadId};
    use helpline_core::help::{HelpSystem, TagAssignmentEngine, TagCatalog, ThreadCategorizationService};
    use helpline_core::moderation::{ModerationActionFlow, ModerationPolicy};
    use helpline_db::{InMemoryHelpThreadRepository, InMemoryModerationActionRepository};

    use super::{ActivitySweep, ActivityUpdater};

    fn guild() -> GuildId {
        GuildId("G1".to_owned())
    }

    fn thread(id: &str, archived: bool) -> HelpThread {
        HelpThread {
            id: ThreadId(id.to_owned()),
            guild_id: guild(),
            forum_id: ForumId("F1".to_owned()),
            forum_name: "questions".to_owned(),
            title: format!("question {id}"),
            author_id: UserId("asker".to_owned()),
            archived,
            created_at: Utc::now(),
        }
    }

    fn message(author: &str) -> MessageSummary {
        MessageSummary { author_id: UserId(author.to_owned()), author_is_bot: false }
    }

    async fn updater(platform: &Arc<InMemoryPlatform>) -> ActivityUpdater {
        let bot = Member {
            user_id: UserId("bot".to_owned()),
            display_name: "helpline".to_owned(),
            roles: vec![Role { id: RoleId("r-bot".to_owned()), name: "Bot".to_owned(), position: 50 }],
            is_owner: false,
        };
        platform.add_guild(guild(), "Helpline", bot).await;
        platform
            .add_forum(
                Forum { id: ForumId("F1".to_owned()), guild_id: guild(), name: "questions".to_owned() },
                &["Java", "Other", "Nobody helped yet", "Needs attention", "Active"],
            )
            .await;

        let config = HelpSystemConfig {
            categories: vec!["Java".to_owned(), "Other".to_owned()],
            activity_high_threshold: 2,
            ..HelpSystemConfig::default()
        };
        let catalog = Arc::new(TagCatalog::from_config(&config).expect("catalog"));
        let policy = ModerationPolicy::from_config(&ModerationConfig::default()).expect("policy");
        let services = Arc::new(HelplineServices {
            categorization: ThreadCategorizationService::new(
                TagAssignmentEngine::new(catalog),
                platform.clone(),
                config.max_tags_per_thread,
            ),
            help: HelpSystem::new(
                config.clone(),
                platform.clone(),
                platform.clone(),
                Arc::new(InMemoryHelpThreadRepository::default()),
            )
            .expect("help system"),
            moderation: ModerationActionFlow::new(
                policy,
                platform.clone(),
                platform.clone(),
                Arc::new(InMemoryModerationActionRepository::default()),
            ),
            forums: platform.clone(),
            thread_messenger: platform.clone(),
        });

        ActivityUpdater::new(services, platform.clone(), &config)
    }

    #[tokio::test]
    async fn sweep_labels_open_threads_by_helper_messages() {
        let platform = Arc::new(InMemoryPlatform::new());
        let updater = updater(&platform).await;
        platform.open_thread(thread("busy", false), &["Java", "Nobody helped yet"]).await.expect("thread");
        platform.open_thread(thread("quiet", false), &["Other"]).await.expect("thread");
        platform.open_thread(thread("closed", true), &["Other"]).await.expect("thread");
        let busy = ThreadId("busy".to_owned());
        for author in ["asker", "helper-a", "helper-b"] {
            platform.record_message(&busy, message(author)).await;
        }

        let sweep = updater.sweep().await;

        assert_eq!(sweep, ActivitySweep { examined: 2, relabelled: 2, failed: 0 });
        assert_eq!(platform.applied_label_names(&busy).await, vec!["Active", "Java"]);
        assert_eq!(
            platform.applied_label_names(&ThreadId("quiet".to_owned())).await,
            vec!["Nobody helped yet", "Other"]
        );
        assert_eq!(platform.applied_label_names(&ThreadId("closed".to_owned())).await, vec!["Other"]);
    }

    #[tokio::test]
    async fn second_sweep_without_new_messages_changes_nothing() {
        let platform = Arc::new(InMemoryPlatform::new());
        let updater = updater(&platform).await;
        platform.open_thread(thread("quiet", false), &["Other"]).await.expect("thread");

        updater.sweep().await;
        let second = updater.sweep().await;

        assert_eq!(second, ActivitySweep { examined: 1, relabelled: 0, failed: 0 });
    }
}
