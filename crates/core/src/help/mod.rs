pub mod activity;
pub mod catalog;
pub mod engine;
pub mod service;
pub mod system;

pub use activity::determine_activity;
pub use catalog::{LabelFamily, TagCatalog, ThreadActivity};
pub use engine::{LabelSetChange, TagAssignmentEngine};
pub use service::{CategorizationOutcome, ThreadCategorizationService};
pub use system::{HelpSystem, TitleChange};
