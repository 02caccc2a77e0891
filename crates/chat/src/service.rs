use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use helpline_core::domain::member::UserId;
use helpline_core::domain::moderation::{ActionDuration, ActionKind};
use helpline_core::domain::thread::{GuildId, HelpThread, ThreadId};
use helpline_core::errors::ApplicationError;
use helpline_core::help::{
    CategorizationOutcome, HelpSystem, ThreadActivity, ThreadCategorizationService, TitleChange,
};
use helpline_core::moderation::{ModerationActionFlow, ModerationRequest};
use helpline_core::ports::ForumGateway;

use crate::blocks::{self, MessageTemplate};
use crate::commands::{CommandRouteError, CommandService, SlashCommandPayload};
use crate::events::{EventContext, EventHandlerError, ThreadCreatedEvent, ThreadCreatedService};
use crate::platform::ThreadMessenger;

/// Everything the command and event handlers need, built once at startup.
pub struct HelplineServices {
    pub help: HelpSystem,
    pub categorization: ThreadCategorizationService,
    pub moderation: ModerationActionFlow,
    pub forums: Arc<dyn ForumGateway>,
    pub thread_messenger: Arc<dyn ThreadMessenger>,
}

#[derive(Clone)]
pub struct HelplineCommandService {
    services: Arc<HelplineServices>,
}

impl HelplineCommandService {
    pub fn new(services: Arc<HelplineServices>) -> Self {
        Self { services }
    }

    async fn help_thread(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<Option<HelpThread>, ApplicationError> {
        let thread =
            self.services.forums.thread(&ThreadId(payload.channel_id.clone())).await?;
        Ok(thread.filter(|thread| self.services.help.is_help_thread(thread)))
    }

    async fn category(
        &self,
        category: &str,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, ApplicationError> {
        let Some(thread) = self.help_thread(payload).await? else {
            return Ok(not_a_help_thread(payload));
        };

        match self.services.categorization.set_category(&thread, category).await? {
            CategorizationOutcome::Unchanged => Ok(blocks::category_unchanged_message(category)),
            CategorizationOutcome::Applied { .. } => {
                let helper_role =
                    self.services.help.find_role_for_category(&thread.guild_id, category).await?;
                Ok(blocks::category_changed_message(
                    category,
                    helper_role.as_ref().map(|role| role.mention()).as_deref(),
                ))
            }
        }
    }

    async fn title(
        &self,
        title: &str,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, ApplicationError> {
        let Some(thread) = self.help_thread(payload).await? else {
            return Ok(not_a_help_thread(payload));
        };

        Ok(match self.services.help.rename_thread(&thread, title).await? {
            TitleChange::Unchanged => blocks::title_unchanged_message(title),
            TitleChange::Renamed => blocks::title_changed_message(title),
        })
    }
}

fn not_a_help_thread(payload: &SlashCommandPayload) -> MessageTemplate {
    blocks::error_message("This command can only be used in help threads.", &payload.request_id)
}

/// Turns a failure into a private reply; the details only go to the log.
fn failure_message(error: ApplicationError, payload: &SlashCommandPayload) -> MessageTemplate {
    if matches!(error, ApplicationError::Domain(_)) {
        info!(
            event_name = "command.refused",
            correlation_id = %payload.request_id,
            command = %payload.command,
            error = %error,
            "command refused"
        );
    } else {
        warn!(
            event_name = "command.failed",
            correlation_id = %payload.request_id,
            command = %payload.command,
            transient = error.is_transient(),
            error = %error,
            "command failed"
        );
    }

    let interface = error.into_interface(payload.request_id.clone());
    blocks::error_message(&interface.user_message(), interface.correlation_id())
}

#[async_trait]
impl CommandService for HelplineCommandService {
    async fn change_category(
        &self,
        category: String,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(self
            .category(&category, payload)
            .await
            .unwrap_or_else(|error| failure_message(error, payload)))
    }

    async fn change_title(
        &self,
        title: String,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(self.title(&title, payload).await.unwrap_or_else(|error| failure_message(error, payload)))
    }

    async fn moderate(
        &self,
        kind: ActionKind,
        target: UserId,
        duration: ActionDuration,
        reason: String,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let request = ModerationRequest {
            guild_id: GuildId(payload.guild_id.clone()),
            actor_id: UserId(payload.user_id.clone()),
            target_id: target,
            kind,
            duration,
            reason,
        };

        Ok(match self.services.moderation.issue(request).await {
            Ok(feedback) => blocks::moderation_feedback_message(&feedback),
            Err(error) => failure_message(error, payload),
        })
    }

    async fn audit(
        &self,
        target: UserId,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let history = self
            .services
            .moderation
            .history(&GuildId(payload.guild_id.clone()), &target)
            .await;

        Ok(match history {
            Ok(actions) => blocks::audit_message(&format!("<@{}>", target.0), &actions),
            Err(error) => failure_message(error, payload),
        })
    }
}

/// Welcomes new help threads: records the author, marks the thread as not yet
/// helped and posts the tips message.
#[derive(Clone)]
pub struct HelpThreadCreatedService {
    services: Arc<HelplineServices>,
}

impl HelpThreadCreatedService {
    pub fn new(services: Arc<HelplineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ThreadCreatedService for HelpThreadCreatedService {
    async fn handle_thread_created(
        &self,
        event: &ThreadCreatedEvent,
        ctx: &EventContext,
    ) -> Result<bool, EventHandlerError> {
        let thread = &event.thread;
        if !self.services.help.is_help_thread(thread) {
            return Ok(false);
        }

        let failed = |error: ApplicationError| EventHandlerError::ThreadCreated(error.to_string());

        self.services.help.record_thread_creation(thread).await.map_err(failed)?;
        self.services
            .categorization
            .set_activity(thread, ThreadActivity::Low)
            .await
            .map_err(failed)?;
        self.services
            .thread_messenger
            .post_message(&thread.id, &blocks::help_thread_explanation())
            .await
            .map_err(failed)?;

        info!(
            event_name = "help.thread.welcomed",
            correlation_id = %ctx.correlation_id,
            guild_id = %thread.guild_id.0,
            thread_id = %thread.id.0,
            "help thread set up"
        );
        Ok(true)
    }
}
