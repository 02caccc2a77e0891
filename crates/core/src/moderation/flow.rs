use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::member::{Member, UserId};
use crate::domain::moderation::{
    ActionDuration, ActionId, ActionKind, ModerationAction, Restriction,
};
use crate::domain::thread::GuildId;
use crate::errors::{ApplicationError, DomainError};
use crate::moderation::checks::{authorize, AuthorizationContext, ModerationPolicy};
use crate::ports::{DirectMessenger, GuildGateway, ModerationActionRepository};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModerationRequest {
    pub guild_id: GuildId,
    pub actor_id: UserId,
    pub target_id: UserId,
    pub kind: ActionKind,
    /// Ignored for kinds that do not last over time.
    pub duration: ActionDuration,
    pub reason: String,
}

/// What the issuing moderator is told once an action went through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModerationFeedback {
    pub action_id: ActionId,
    pub kind: ActionKind,
    pub actor: String,
    pub target: String,
    pub duration: Option<ActionDuration>,
    pub reason: String,
    /// Whether the target received the direct message.
    pub notified: bool,
}

impl ModerationFeedback {
    pub fn title(&self) -> String {
        format!("{} {} {}", self.actor, self.kind.past_tense(), self.target)
    }

    pub fn description(&self) -> String {
        let mut description = match &self.duration {
            Some(duration) => {
                format!("The {} duration is: {}\nReason: {}", self.kind, duration.label(), self.reason)
            }
            None => format!("Reason: {}", self.reason),
        };
        if !self.notified {
            description.push_str("\n(Unable to send them a DM.)");
        }
        description
    }
}

/// Runs a moderation action: gather context, authorize, notify the target,
/// then apply the restriction and record it.
pub struct ModerationActionFlow {
    policy: ModerationPolicy,
    guilds: Arc<dyn GuildGateway>,
    messenger: Arc<dyn DirectMessenger>,
    actions: Arc<dyn ModerationActionRepository>,
}

impl ModerationActionFlow {
    pub fn new(
        policy: ModerationPolicy,
        guilds: Arc<dyn GuildGateway>,
        messenger: Arc<dyn DirectMessenger>,
        actions: Arc<dyn ModerationActionRepository>,
    ) -> Self {
        Self { policy, guilds, messenger, actions }
    }

    pub async fn issue(
        &self,
        request: ModerationRequest,
    ) -> Result<ModerationFeedback, ApplicationError> {
        let guild = &request.guild_id;
        let kind = request.kind;

        let actor = self.guilds.member(guild, &request.actor_id).await?.ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "the invoking user {} is not a member of guild {}",
                request.actor_id.0, guild.0
            ))
        })?;
        let target = self.guilds.member(guild, &request.target_id).await?;
        let bot = self.guilds.self_member(guild).await?;

        let restriction_role = match self.policy.restriction_role_pattern(kind) {
            Some(pattern) => {
                let roles = self.guilds.roles(guild).await?;
                let role = self.policy.find_restriction_role(kind, &roles).cloned().ok_or_else(
                    || {
                        ApplicationError::Configuration(format!(
                            "no role matching `{}` exists in guild {} to {kind} members",
                            pattern.as_str(),
                            guild.0
                        ))
                    },
                )?;
                Some(role)
            }
            None => None,
        };

        authorize(
            &self.policy,
            AuthorizationContext {
                kind,
                actor: &actor,
                target: target.as_ref(),
                bot: &bot,
                restriction_role: restriction_role.as_ref(),
                reason: &request.reason,
            },
        )
        .map_err(|denial| {
            info!(
                event_name = "moderation.action.denied",
                guild_id = %guild.0,
                actor_id = %request.actor_id.0,
                target_id = %request.target_id.0,
                kind = %kind,
                reason = %denial,
                "moderation action refused"
            );
            DomainError::from(denial)
        })?;

        let Some(target) = target else {
            return Err(DomainError::InvariantViolation(
                "authorized moderation action without a target member".to_owned(),
            )
            .into());
        };

        let duration = kind.is_lasting().then(|| request.duration.clone());
        let issued_at = Utc::now();
        let action = ModerationAction {
            id: ActionId::generate(),
            guild_id: guild.clone(),
            actor_id: request.actor_id.clone(),
            target_id: request.target_id.clone(),
            kind,
            issued_at,
            expires_at: duration.as_ref().and_then(|duration| duration.expires_at(issued_at)),
            reason: request.reason.clone(),
        };

        // The target must hear about it while they can still receive messages.
        let notified = self.notify(guild, &target, kind, duration.as_ref(), &request.reason).await;

        let restriction = match kind {
            ActionKind::Mute | ActionKind::Quarantine => match restriction_role {
                Some(role) => Restriction::AssignRole(role),
                None => {
                    return Err(DomainError::InvariantViolation(format!(
                        "{kind} requires a restriction role"
                    ))
                    .into())
                }
            },
            ActionKind::Kick => Restriction::Kick,
            ActionKind::Ban => Restriction::Ban,
            ActionKind::Warn => Restriction::RecordOnly,
        };

        let (applied, recorded) = tokio::join!(
            self.apply(guild, &target.user_id, &restriction, &request.reason),
            self.actions.append(action.clone()),
        );
        applied?;
        recorded?;

        info!(
            event_name = "moderation.action.issued",
            guild_id = %guild.0,
            action_id = %action.id.0,
            actor_id = %action.actor_id.0,
            target_id = %action.target_id.0,
            kind = %kind,
            expires_at = ?action.expires_at,
            notified,
            reason = %action.reason,
            sensitive = true,
            "moderation action issued"
        );

        Ok(ModerationFeedback {
            action_id: action.id,
            kind,
            actor: actor.display_name,
            target: target.display_name,
            duration,
            reason: request.reason,
            notified,
        })
    }

    /// Recorded actions against `target`, oldest first.
    pub async fn history(
        &self,
        guild: &GuildId,
        target: &UserId,
    ) -> Result<Vec<ModerationAction>, ApplicationError> {
        self.actions.actions_against(guild, target).await
    }

    async fn apply(
        &self,
        guild: &GuildId,
        target: &UserId,
        restriction: &Restriction,
        reason: &str,
    ) -> Result<(), ApplicationError> {
        if *restriction == Restriction::RecordOnly {
            return Ok(());
        }
        self.guilds.apply_restriction(guild, target, restriction, reason).await
    }

    async fn notify(
        &self,
        guild: &GuildId,
        target: &Member,
        kind: ActionKind,
        duration: Option<&ActionDuration>,
        reason: &str,
    ) -> bool {
        let guild_name = match self.guilds.guild_name(guild).await {
            Ok(name) => name,
            Err(error) => {
                warn!(
                    event_name = "moderation.notify.failed",
                    guild_id = %guild.0,
                    target_id = %target.user_id.0,
                    error = %error,
                    "unable to resolve guild name for the notification"
                );
                return false;
            }
        };

        let content = notification_text(kind, duration, &guild_name, reason);
        match self.messenger.send_direct_message(&target.user_id, &content).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "moderation.notify.failed",
                    guild_id = %guild.0,
                    target_id = %target.user_id.0,
                    error = %error,
                    "direct message to moderated user failed"
                );
                false
            }
        }
    }
}

pub fn notification_text(
    kind: ActionKind,
    duration: Option<&ActionDuration>,
    guild_name: &str,
    reason: &str,
) -> String {
    let mut text = format!(
        "Hey there, sorry to tell you but unfortunately you have been {} in the server {guild_name}.\n{}",
        kind.past_tense(),
        kind.consequence()
    );
    if let Some(duration) = duration {
        text.push_str(&format!("\nThe {kind} duration is: {}", duration.label()));
    }
    text.push_str(&format!("\nThe reason for the {kind} is:\n{reason}"));
    text
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{notification_text, ModerationActionFlow, ModerationRequest};
    use crate::config::ModerationConfig;
    use crate::domain::member::UserId;
    use crate::domain::moderation::{ActionDuration, ActionKind, Restriction};
    use crate::domain::thread::GuildId;
    use crate::errors::{ApplicationError, DomainError};
    use crate::moderation::checks::{AuthorizationDenial, ModerationPolicy};
    use crate::testing::{member, role, RecordingStore, ScriptedGuild, ScriptedMessenger, GUILD};

    struct Fixture {
        flow: ModerationActionFlow,
        guild: Arc<ScriptedGuild>,
        messenger: Arc<ScriptedMessenger>,
        store: Arc<RecordingStore>,
    }

    fn fixture(target_roles: Vec<crate::domain::member::Role>, dm_fails: bool) -> Fixture {
        let guild = Arc::new(ScriptedGuild::new(
            vec![role("Muted", 4), role("Quarantined", 4), role("Moderator", 10)],
            member("bot", vec![role("Bot", 20)]),
            vec![member("mod", vec![role("Moderator", 10)]), member("duke", target_roles)],
        ));
        let messenger = Arc::new(ScriptedMessenger { fail: dm_fails, ..ScriptedMessenger::default() });
        let store = Arc::new(RecordingStore::default());
        let policy = ModerationPolicy::from_config(&ModerationConfig::default()).expect("policy");
        let flow =
            ModerationActionFlow::new(policy, guild.clone(), messenger.clone(), store.clone());
        Fixture { flow, guild, messenger, store }
    }

    fn request(kind: ActionKind, duration: &str) -> ModerationRequest {
        ModerationRequest {
            guild_id: GuildId(GUILD.to_owned()),
            actor_id: UserId("mod".to_owned()),
            target_id: UserId("duke".to_owned()),
            kind,
            duration: ActionDuration::from_choice(duration).expect("duration"),
            reason: "spam".to_owned(),
        }
    }

    #[tokio::test]
    async fn mute_notifies_restricts_and_records() {
        let fixture = fixture(vec![role("Member", 1)], false);

        let feedback =
            fixture.flow.issue(request(ActionKind::Mute, "1 hour")).await.expect("mute succeeds");

        assert!(feedback.notified);
        assert_eq!(feedback.title(), "mod muted duke");
        assert_eq!(feedback.description(), "The mute duration is: 1 hour\nReason: spam");

        let sent = fixture.messenger.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("muted in the server Helpline Test Guild"));

        let guild = fixture.guild.state.lock().await;
        assert!(matches!(
            &guild.applied[..],
            [(_, Restriction::AssignRole(role), _)] if role.name == "Muted"
        ));

        let actions = fixture.store.actions.lock().await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Mute);
        assert!(actions[0].expires_at.is_some());
    }

    #[tokio::test]
    async fn already_muted_target_is_refused_without_side_effects() {
        let fixture = fixture(vec![role("Muted", 4)], false);

        let error = fixture
            .flow
            .issue(request(ActionKind::Mute, "1 hour"))
            .await
            .expect_err("already muted");

        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::AuthorizationDenied(
                AuthorizationDenial::AlreadyRestricted { .. }
            ))
        ));
        assert!(fixture.messenger.sent.lock().await.is_empty());
        assert!(fixture.guild.state.lock().await.applied.is_empty());
        assert!(fixture.store.actions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_dm_still_applies_and_qualifies_feedback() {
        let fixture = fixture(vec![role("Member", 1)], true);

        let feedback =
            fixture.flow.issue(request(ActionKind::Ban, "permanent")).await.expect("ban succeeds");

        assert!(!feedback.notified);
        assert!(feedback.description().ends_with("\n(Unable to send them a DM.)"));
        assert_eq!(fixture.guild.state.lock().await.applied.len(), 1);
        let actions = fixture.store.actions.lock().await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].expires_at, None);
    }

    #[tokio::test]
    async fn failed_restriction_is_fatal() {
        let fixture = fixture(vec![role("Member", 1)], false);
        fixture.guild.state.lock().await.fail_restrictions = true;

        let error = fixture
            .flow
            .issue(request(ActionKind::Kick, "permanent"))
            .await
            .expect_err("restriction fails");

        assert_eq!(error, ApplicationError::Integration("missing permissions".to_owned()));
    }

    #[tokio::test]
    async fn warning_is_recorded_without_platform_change() {
        let fixture = fixture(vec![role("Member", 1)], false);

        let feedback =
            fixture.flow.issue(request(ActionKind::Warn, "1 day")).await.expect("warn succeeds");

        assert_eq!(feedback.duration, None);
        assert_eq!(feedback.description(), "Reason: spam");
        assert!(fixture.guild.state.lock().await.applied.is_empty());

        let history = fixture
            .flow
            .history(&GuildId(GUILD.to_owned()), &UserId("duke".to_owned()))
            .await
            .expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].expires_at, None);
    }

    #[tokio::test]
    async fn missing_restriction_role_is_a_configuration_error() {
        let fixture = fixture(vec![role("Member", 1)], false);
        fixture.guild.state.lock().await.roles.retain(|role| role.name != "Quarantined");

        let error = fixture
            .flow
            .issue(request(ActionKind::Quarantine, "3 days"))
            .await
            .expect_err("no quarantine role");

        assert!(matches!(error, ApplicationError::Configuration(ref message) if message.contains("Quarantined")));
        assert!(fixture.messenger.sent.lock().await.is_empty());
    }

    #[test]
    fn notification_mentions_duration_only_when_given() {
        let lasting = notification_text(
            ActionKind::Quarantine,
            Some(&ActionDuration::Permanent),
            "Guild",
            "rude",
        );
        let once = notification_text(ActionKind::Kick, None, "Guild", "rude");

        assert!(lasting.contains("The quarantine duration is: permanent"));
        assert!(!once.contains("duration"));
        assert!(once.ends_with("The reason for the kick is:\nrude"));
    }
}
