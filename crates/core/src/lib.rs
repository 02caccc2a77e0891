pub mod config;
pub mod domain;
pub mod errors;
pub mod help;
pub mod moderation;
pub mod ports;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::label::{Label, LabelId};
pub use domain::member::{Member, Role, RoleId, UserId};
pub use domain::moderation::{ActionDuration, ActionId, ActionKind, ModerationAction, Restriction};
pub use domain::thread::{Forum, ForumId, GuildId, HelpThread, HelpThreadRecord, ThreadId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use help::{
    CategorizationOutcome, HelpSystem, LabelFamily, TagAssignmentEngine, TagCatalog,
    ThreadActivity, ThreadCategorizationService,
};
pub use moderation::{ModerationActionFlow, ModerationFeedback, ModerationRequest};
