use regex::Regex;
use thiserror::Error;

use crate::config::{full_match_regex, ModerationConfig};
use crate::domain::member::{Member, Role};
use crate::domain::moderation::ActionKind;
use crate::errors::ApplicationError;

/// Why a moderation request was refused before anything was changed. The text
/// is shown to the moderator who issued the command.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthorizationDenial {
    #[error("The user is not a member of this server.")]
    TargetNotMember,
    #[error("You can not {verb} yourself.")]
    SelfTarget { verb: &'static str },
    #[error("The reason is too long ({length} characters, at most {max} are allowed).")]
    ReasonTooLong { length: usize, max: usize },
    #[error("I can not assign the role {role}, since it is not below my own roles.")]
    BotCannotManageRole { role: String },
    #[error("You can not {verb} {target}, since they are at least as powerful as you.")]
    ActorOutranked { target: String, verb: &'static str },
    #[error("I can not {verb} {target}, since they are at least as powerful as me.")]
    BotOutranked { target: String, verb: &'static str },
    #[error("The user {target} is already restricted ({verb}).")]
    AlreadyRestricted { target: String, verb: &'static str },
}

/// Compiled moderation rules derived from configuration.
#[derive(Clone, Debug)]
pub struct ModerationPolicy {
    muted_role: Regex,
    quarantined_role: Regex,
    max_reason_length: usize,
}

impl ModerationPolicy {
    pub fn from_config(config: &ModerationConfig) -> Result<Self, ApplicationError> {
        let compile = |key: &str, pattern: &str| {
            full_match_regex(pattern).map_err(|error| {
                ApplicationError::Configuration(format!("invalid {key} `{pattern}`: {error}"))
            })
        };

        Ok(Self {
            muted_role: compile("muted role pattern", &config.muted_role_pattern)?,
            quarantined_role: compile("quarantined role pattern", &config.quarantined_role_pattern)?,
            max_reason_length: config.max_reason_length,
        })
    }

    /// The pattern naming the role that implements `kind`, for role-based kinds.
    pub fn restriction_role_pattern(&self, kind: ActionKind) -> Option<&Regex> {
        match kind {
            ActionKind::Mute => Some(&self.muted_role),
            ActionKind::Quarantine => Some(&self.quarantined_role),
            ActionKind::Warn | ActionKind::Kick | ActionKind::Ban => None,
        }
    }

    pub fn find_restriction_role<'a>(&self, kind: ActionKind, roles: &'a [Role]) -> Option<&'a Role> {
        let pattern = self.restriction_role_pattern(kind)?;
        roles.iter().find(|role| pattern.is_match(&role.name))
    }

    pub fn is_restricted(&self, member: &Member, kind: ActionKind) -> bool {
        self.restriction_role_pattern(kind)
            .is_some_and(|pattern| member.roles.iter().any(|role| pattern.is_match(&role.name)))
    }
}

/// Everything the authorization decision needs, gathered up front.
#[derive(Clone, Copy, Debug)]
pub struct AuthorizationContext<'a> {
    pub kind: ActionKind,
    pub actor: &'a Member,
    pub target: Option<&'a Member>,
    pub bot: &'a Member,
    pub restriction_role: Option<&'a Role>,
    pub reason: &'a str,
}

/// Local precondition checks; no side effects.
pub fn authorize(
    policy: &ModerationPolicy,
    context: AuthorizationContext<'_>,
) -> Result<(), AuthorizationDenial> {
    let verb = context.kind.as_str();
    let target = context.target.ok_or(AuthorizationDenial::TargetNotMember)?;

    if target.user_id == context.actor.user_id {
        return Err(AuthorizationDenial::SelfTarget { verb });
    }

    let length = context.reason.chars().count();
    if length > policy.max_reason_length {
        return Err(AuthorizationDenial::ReasonTooLong { length, max: policy.max_reason_length });
    }

    if let Some(role) = context.restriction_role {
        if !context.bot.can_manage_role(role) {
            return Err(AuthorizationDenial::BotCannotManageRole { role: role.name.clone() });
        }
    }

    if !context.actor.outranks(target) {
        return Err(AuthorizationDenial::ActorOutranked {
            target: target.display_name.clone(),
            verb,
        });
    }
    if !context.bot.outranks(target) {
        return Err(AuthorizationDenial::BotOutranked { target: target.display_name.clone(), verb });
    }

    if policy.is_restricted(target, context.kind) {
        return Err(AuthorizationDenial::AlreadyRestricted {
            target: target.display_name.clone(),
            verb,
        });
    }

    Ok(())
}
