pub mod checks;
pub mod flow;

pub use checks::{authorize, AuthorizationContext, AuthorizationDenial, ModerationPolicy};
pub use flow::{ModerationActionFlow, ModerationFeedback, ModerationRequest};
