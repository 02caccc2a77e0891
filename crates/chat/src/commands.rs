use async_trait::async_trait;
use thiserror::Error;

use helpline_core::domain::member::UserId;
use helpline_core::domain::moderation::{ActionDuration, ActionKind, DURATION_CHOICES};

use crate::blocks::{self, MessageTemplate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub guild_id: String,
    /// The channel or thread the command was invoked in.
    pub channel_id: String,
    pub user_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HelpThreadCommand {
    Category { name: String },
    Title { title: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    HelpThread(HelpThreadCommand),
    Moderate { kind: ActionKind, target: UserId, duration: ActionDuration, reason: String },
    Audit { target: UserId },
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("missing argument `{argument}` for `{command}`")]
    MissingArgument { command: String, argument: &'static str },
    #[error("`{0}` is not a valid user")]
    InvalidUser(String),
    #[error("unknown duration, choose one of: {}", DURATION_CHOICES.join(", "))]
    InvalidDuration,
    #[error("unknown subcommand `{subcommand}` for `{command}`")]
    UnknownSubcommand { command: String, subcommand: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn parse_command(payload: &SlashCommandPayload) -> Result<Command, CommandParseError> {
    let name = payload.command.trim().trim_start_matches('/').to_ascii_lowercase();
    let text = payload.text.trim();

    match name.as_str() {
        "help-thread" => parse_help_thread(&name, text).map(Command::HelpThread),
        "mute" | "ban" => {
            let kind = name.parse::<ActionKind>().map_err(CommandParseError::UnsupportedCommand)?;
            let (target, rest) = split_target(&name, text)?;
            let (duration, rest) = split_duration(rest)?;
            Ok(Command::Moderate { kind, target, duration, reason: require_reason(&name, rest)? })
        }
        "quarantine" | "kick" | "warn" => {
            let kind = name.parse::<ActionKind>().map_err(CommandParseError::UnsupportedCommand)?;
            let (target, rest) = split_target(&name, text)?;
            Ok(Command::Moderate {
                kind,
                target,
                duration: ActionDuration::Permanent,
                reason: require_reason(&name, rest)?,
            })
        }
        "audit" => {
            let (target, _) = split_target(&name, text)?;
            Ok(Command::Audit { target })
        }
        "helpline" | "help" => Ok(Command::Help),
        _ => Err(CommandParseError::UnsupportedCommand(payload.command.clone())),
    }
}

fn parse_help_thread(command: &str, text: &str) -> Result<HelpThreadCommand, CommandParseError> {
    let (subcommand, rest) = split_word(text);
    let argument = rest.trim();

    match subcommand.to_ascii_lowercase().as_str() {
        "category" if !argument.is_empty() => {
            Ok(HelpThreadCommand::Category { name: argument.to_owned() })
        }
        "category" => Err(CommandParseError::MissingArgument {
            command: command.to_owned(),
            argument: "category",
        }),
        "title" if !argument.is_empty() => Ok(HelpThreadCommand::Title { title: argument.to_owned() }),
        "title" => {
            Err(CommandParseError::MissingArgument { command: command.to_owned(), argument: "title" })
        }
        "" => Err(CommandParseError::MissingArgument {
            command: command.to_owned(),
            argument: "subcommand",
        }),
        other => Err(CommandParseError::UnknownSubcommand {
            command: command.to_owned(),
            subcommand: other.to_owned(),
        }),
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(index) => (&text[..index], &text[index..]),
        None => (text, ""),
    }
}

/// Accepts a raw id or a mention such as `<@123>` / `<@!123>`.
pub fn parse_user(token: &str) -> Option<UserId> {
    let id = token
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|rest| rest.trim_start_matches('!'))
        .unwrap_or(token);

    (!id.is_empty() && id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'))
        .then(|| UserId(id.to_owned()))
}

fn split_target<'a>(command: &str, text: &'a str) -> Result<(UserId, &'a str), CommandParseError> {
    let (token, rest) = split_word(text);
    if token.is_empty() {
        return Err(CommandParseError::MissingArgument {
            command: command.to_owned(),
            argument: "user",
        });
    }
    let target = parse_user(token).ok_or_else(|| CommandParseError::InvalidUser(token.to_owned()))?;
    Ok((target, rest))
}

/// Durations are picked from a fixed list; multi-word choices are matched as a prefix.
fn split_duration(text: &str) -> Result<(ActionDuration, &str), CommandParseError> {
    let text = text.trim_start();
    let lowered = text.to_ascii_lowercase();

    DURATION_CHOICES
        .iter()
        .filter(|choice| {
            lowered.starts_with(*choice)
                && lowered[choice.len()..].chars().next().map_or(true, char::is_whitespace)
        })
        .max_by_key(|choice| choice.len())
        .and_then(|choice| {
            ActionDuration::from_choice(choice).map(|duration| (duration, &text[choice.len()..]))
        })
        .ok_or(CommandParseError::InvalidDuration)
}

fn require_reason(command: &str, text: &str) -> Result<String, CommandParseError> {
    let reason = text.trim();
    if reason.is_empty() {
        return Err(CommandParseError::MissingArgument {
            command: command.to_owned(),
            argument: "reason",
        });
    }
    Ok(reason.to_owned())
}

#[async_trait]
pub trait CommandService: Send + Sync {
    async fn change_category(
        &self,
        category: String,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn change_title(
        &self,
        title: String,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn moderate(
        &self,
        kind: ActionKind,
        target: UserId,
        duration: ActionDuration,
        reason: String,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn audit(
        &self,
        target: UserId,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Parse failures become a private usage hint rather than an error.
    pub async fn route(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let command = match parse_command(payload) {
            Ok(command) => command,
            Err(CommandParseError::UnsupportedCommand(command)) => {
                return Ok(blocks::error_message(
                    &format!("Unsupported command `{command}`. Try `/helpline`."),
                    &payload.request_id,
                ))
            }
            Err(error) => {
                return Ok(blocks::error_message(
                    &format!("Unable to read the command: {error}."),
                    &payload.request_id,
                ))
            }
        };

        match command {
            Command::HelpThread(HelpThreadCommand::Category { name }) => {
                self.service.change_category(name, payload).await
            }
            Command::HelpThread(HelpThreadCommand::Title { title }) => {
                self.service.change_title(title, payload).await
            }
            Command::Moderate { kind, target, duration, reason } => {
                self.service.moderate(kind, target, duration, reason, payload).await
            }
            Command::Audit { target } => self.service.audit(target, payload).await,
            Command::Help => Ok(blocks::help_message()),
        }
    }
}
