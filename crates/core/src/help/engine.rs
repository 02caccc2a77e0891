use std::sync::Arc;

use crate::domain::label::Label;
use crate::errors::{ApplicationError, DomainError};
use crate::help::catalog::{LabelFamily, TagCatalog};

/// Result of a label assignment. `Unchanged` means no write is needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LabelSetChange {
    Unchanged,
    Replaced(Vec<Label>),
}

impl LabelSetChange {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Replaced(_))
    }

    /// The label set after the change, given the set it was computed from.
    pub fn resolve<'a>(&'a self, current: &'a [Label]) -> &'a [Label] {
        match self {
            Self::Unchanged => current,
            Self::Replaced(next) => next,
        }
    }
}

/// Pure decision logic for keeping at most one label per family on a thread,
/// within the platform's capacity, with the newest assignment in front.
#[derive(Clone, Debug)]
pub struct TagAssignmentEngine {
    catalog: Arc<TagCatalog>,
}

impl TagAssignmentEngine {
    pub fn new(catalog: Arc<TagCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TagCatalog {
        &self.catalog
    }

    /// The label treated as the thread's current value for `family`. When several
    /// are present, the one with the lowest catalog rank wins; ties keep the first.
    pub fn current_representative<'a>(
        &self,
        current: &'a [Label],
        family: LabelFamily,
    ) -> Option<&'a Label> {
        current
            .iter()
            .filter_map(|label| {
                self.catalog.priority_of(family, &label.name).map(|rank| (rank, label))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, label)| label)
    }

    /// Whether assigning `target_name` would leave `current` untouched.
    pub fn is_noop(&self, current: &[Label], family: LabelFamily, target_name: &str) -> bool {
        self.current_representative(current, family)
            .is_some_and(|representative| representative.name == target_name)
    }

    /// Computes the label set after assigning `target_name` for `family`.
    ///
    /// `resolve` looks the target up in the parent forum's available labels. It is
    /// only consulted when a change is actually needed; a miss is a configuration
    /// error because the live platform disagrees with the configured catalog.
    pub fn compute_next_label_set<F>(
        &self,
        current: &[Label],
        family: LabelFamily,
        target_name: &str,
        capacity: usize,
        resolve: F,
    ) -> Result<LabelSetChange, ApplicationError>
    where
        F: FnOnce(&str) -> Option<Label>,
    {
        if !self.catalog.is_member(family, target_name) {
            return Err(DomainError::UnknownLabel { family, name: target_name.to_owned() }.into());
        }

        let representative = self.current_representative(current, family);
        if representative.is_some_and(|label| label.name == target_name) {
            return Ok(LabelSetChange::Unchanged);
        }

        let target = resolve(target_name).ok_or_else(|| {
            ApplicationError::Configuration(format!(
                "no label named `{target_name}` is available for {family} assignment"
            ))
        })?;

        // Removal is by position, so the representative goes even if the live
        // forum no longer offers a label with its name.
        let representative_index = representative
            .and_then(|label| current.iter().position(|candidate| std::ptr::eq(candidate, label)));

        let mut working: Vec<Label> = current
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != representative_index)
            .map(|(_, label)| label)
            .filter(|label| label.name != target_name && label.id != target.id)
            .cloned()
            .collect();

        // Drop from the tail (lowest priority) until the target fits in front.
        let keep = capacity.saturating_sub(1);
        if working.len() > keep {
            working.truncate(keep);
        }

        let mut next = Vec::with_capacity(working.len() + 1);
        next.push(target);
        next.extend(working);

        Ok(LabelSetChange::Replaced(next))
    }
}
