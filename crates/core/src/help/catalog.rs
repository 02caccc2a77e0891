use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::HelpSystemConfig;
use crate::errors::DomainError;

/// The two mutually exclusive label groups a help thread carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelFamily {
    Category,
    Activity,
}

impl fmt::Display for LabelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Category => "category",
            Self::Activity => "activity",
        })
    }
}

/// Engagement level of a help thread, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadActivity {
    Low,
    Medium,
    High,
}

impl ThreadActivity {
    pub const ALL: [ThreadActivity; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn label_name(self) -> &'static str {
        match self {
            Self::Low => "Nobody helped yet",
            Self::Medium => "Needs attention",
            Self::High => "Active",
        }
    }

    pub fn from_label_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|activity| activity.label_name() == name)
    }

    fn rank(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

/// Static knowledge of which label names belong to which family, and in which
/// priority order. Built once from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagCatalog {
    categories: Vec<String>,
    category_ranks: HashMap<String, usize>,
}

impl TagCatalog {
    pub fn new(categories: Vec<String>) -> Result<Self, DomainError> {
        let mut category_ranks = HashMap::with_capacity(categories.len());
        for (rank, name) in categories.iter().enumerate() {
            if ThreadActivity::from_label_name(name).is_some() {
                return Err(DomainError::InvariantViolation(format!(
                    "category `{name}` collides with an activity label"
                )));
            }
            if category_ranks.insert(name.clone(), rank).is_some() {
                return Err(DomainError::InvariantViolation(format!(
                    "category `{name}` is listed more than once"
                )));
            }
        }

        Ok(Self { categories, category_ranks })
    }

    pub fn from_config(config: &HelpSystemConfig) -> Result<Self, DomainError> {
        Self::new(config.categories.clone())
    }

    pub fn is_member(&self, family: LabelFamily, name: &str) -> bool {
        self.priority_of(family, name).is_some()
    }

    /// Rank of `name` within `family`; lower is higher priority. `None` if the
    /// name is not part of the family.
    pub fn priority_of(&self, family: LabelFamily, name: &str) -> Option<usize> {
        match family {
            LabelFamily::Category => self.category_ranks.get(name).copied(),
            LabelFamily::Activity => ThreadActivity::from_label_name(name).map(ThreadActivity::rank),
        }
    }

    pub fn all_names(&self, family: LabelFamily) -> Vec<&str> {
        match family {
            LabelFamily::Category => self.categories.iter().map(String::as_str).collect(),
            LabelFamily::Activity => {
                ThreadActivity::ALL.iter().map(|activity| activity.label_name()).collect()
            }
        }
    }

    pub fn family_of(&self, name: &str) -> Option<LabelFamily> {
        [LabelFamily::Category, LabelFamily::Activity]
            .into_iter()
            .find(|family| self.is_member(*family, name))
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelFamily, TagCatalog, ThreadActivity};
    use crate::config::HelpSystemConfig;

    fn catalog() -> TagCatalog {
        TagCatalog::new(vec!["Bug".to_owned(), "Database".to_owned(), "Java".to_owned()])
            .expect("valid catalog")
    }

    #[test]
    fn category_rank_follows_configured_order() {
        let catalog = catalog();

        assert_eq!(catalog.priority_of(LabelFamily::Category, "Bug"), Some(0));
        assert_eq!(catalog.priority_of(LabelFamily::Category, "Java"), Some(2));
        assert_eq!(catalog.priority_of(LabelFamily::Category, "Rust"), None);
        assert!(!catalog.is_member(LabelFamily::Category, "Active"));
    }

    #[test]
    fn activity_family_has_three_ordered_levels() {
        let catalog = catalog();

        assert_eq!(
            catalog.all_names(LabelFamily::Activity),
            vec!["Nobody helped yet", "Needs attention", "Active"]
        );
        assert_eq!(catalog.priority_of(LabelFamily::Activity, "Active"), Some(2));
        assert_eq!(ThreadActivity::from_label_name("Needs attention"), Some(ThreadActivity::Medium));
        assert_eq!(catalog.family_of("Nobody helped yet"), Some(LabelFamily::Activity));
        assert_eq!(catalog.family_of("Database"), Some(LabelFamily::Category));
        assert_eq!(catalog.family_of("UrgentFlag"), None);
    }

    #[test]
    fn duplicate_and_colliding_names_are_rejected() {
        assert!(TagCatalog::new(vec!["Java".to_owned(), "Java".to_owned()]).is_err());
        assert!(TagCatalog::new(vec!["Active".to_owned()]).is_err());
    }

    #[test]
    fn default_configuration_builds_a_catalog() {
        let catalog = TagCatalog::from_config(&HelpSystemConfig::default()).expect("catalog");
        assert_eq!(catalog.all_names(LabelFamily::Category).first(), Some(&"Database"));
    }
}
