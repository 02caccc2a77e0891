use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::label::{label_names, Label};
use crate::domain::thread::HelpThread;
use crate::errors::{ApplicationError, DomainError};
use crate::help::catalog::{LabelFamily, ThreadActivity};
use crate::help::engine::{LabelSetChange, TagAssignmentEngine};
use crate::ports::ForumGateway;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategorizationOutcome {
    /// The thread already carried the requested label; nothing was written.
    Unchanged,
    Applied { labels: Vec<Label> },
}

impl CategorizationOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Applies category and activity labels to live threads. Every mutation reads
/// the thread's labels fresh, so no cached state is trusted.
pub struct ThreadCategorizationService {
    engine: TagAssignmentEngine,
    forums: Arc<dyn ForumGateway>,
    capacity: usize,
}

impl ThreadCategorizationService {
    pub fn new(engine: TagAssignmentEngine, forums: Arc<dyn ForumGateway>, capacity: usize) -> Self {
        Self { engine, forums, capacity }
    }

    pub fn engine(&self) -> &TagAssignmentEngine {
        &self.engine
    }

    pub async fn set_category(
        &self,
        thread: &HelpThread,
        category: &str,
    ) -> Result<CategorizationOutcome, ApplicationError> {
        self.assign(thread, LabelFamily::Category, category).await
    }

    pub async fn set_activity(
        &self,
        thread: &HelpThread,
        activity: ThreadActivity,
    ) -> Result<CategorizationOutcome, ApplicationError> {
        self.assign(thread, LabelFamily::Activity, activity.label_name()).await
    }

    pub async fn current_category(
        &self,
        thread: &HelpThread,
    ) -> Result<Option<Label>, ApplicationError> {
        self.current(thread, LabelFamily::Category).await
    }

    pub async fn current_activity(
        &self,
        thread: &HelpThread,
    ) -> Result<Option<Label>, ApplicationError> {
        self.current(thread, LabelFamily::Activity).await
    }

    async fn current(
        &self,
        thread: &HelpThread,
        family: LabelFamily,
    ) -> Result<Option<Label>, ApplicationError> {
        let applied = self.forums.applied_labels(&thread.id).await?;
        Ok(self.engine.current_representative(&applied, family).cloned())
    }

    async fn assign(
        &self,
        thread: &HelpThread,
        family: LabelFamily,
        target_name: &str,
    ) -> Result<CategorizationOutcome, ApplicationError> {
        if !self.engine.catalog().is_member(family, target_name) {
            return Err(DomainError::UnknownLabel { family, name: target_name.to_owned() }.into());
        }

        let current = self.forums.applied_labels(&thread.id).await?;

        // Skip the forum catalog lookup as well when nothing would change.
        if self.engine.is_noop(&current, family, target_name) {
            debug!(
                event_name = "help.labels.unchanged",
                guild_id = %thread.guild_id.0,
                thread_id = %thread.id.0,
                family = %family,
                label = target_name,
                "thread already carries the requested label"
            );
            return Ok(CategorizationOutcome::Unchanged);
        }

        let available = self.forums.available_labels(&thread.forum_id).await?;
        let change = self
            .engine
            .compute_next_label_set(&current, family, target_name, self.capacity, |name| {
                available.iter().find(|label| label.name == name).cloned()
            })
            .map_err(|error| match error {
                ApplicationError::Configuration(_) => ApplicationError::Configuration(format!(
                    "the forum `{}` in guild {} is missing the label `{target_name}`",
                    thread.forum_name, thread.guild_id.0
                )),
                other => other,
            })?;

        let LabelSetChange::Replaced(next) = change else {
            return Ok(CategorizationOutcome::Unchanged);
        };

        self.forums.set_applied_labels(&thread.id, &next).await?;
        info!(
            event_name = "help.labels.applied",
            guild_id = %thread.guild_id.0,
            thread_id = %thread.id.0,
            family = %family,
            label = target_name,
            labels = ?label_names(&next),
            "thread labels replaced"
        );

        Ok(CategorizationOutcome::Applied { labels: next })
    }
}
