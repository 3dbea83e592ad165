//! Substitution registry: variable name to declared semantic type.
//!
//! The registry is global to one statement. A template variable must have one
//! type wherever it is composed, so a second assignment with a different type
//! is a conflict. Conflicts are always reported; which type survives is
//! decided by the [`ConflictPolicy`].
//!
//! # Summary Table
//! | Policy      | Stored type after conflict | Conflict reported as |
//! |-------------|----------------------------|----------------------|
//! | keep_last   | new type                   | warning              |
//! | keep_first  | previous type              | warning              |
//! | reject      | previous type              | fatal error          |
//!
//! # Example
//! ```rust
//! use sqlsnip::config::ConflictPolicy;
//! use sqlsnip::registry::{SubstitutionRegistry, SubstitutionType};
//!
//! let mut registry = SubstitutionRegistry::new();
//! assert!(registry
//!     .assign("<Cond>", SubstitutionType::Condition, ConflictPolicy::KeepLast)
//!     .is_none());
//! let conflict = registry
//!     .assign("<Cond>", SubstitutionType::Predicand, ConflictPolicy::KeepLast)
//!     .unwrap();
//! assert_eq!(conflict.previous, SubstitutionType::Condition);
//! assert_eq!(registry.get("<Cond>"), Some(SubstitutionType::Predicand));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConflictPolicy;

/// Semantic role a substitution variable plays where it appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionType {
    /// A value: comparison operand, function argument, CASE branch.
    Predicand,
    /// A whole boolean condition: `WHERE <Cond>`, `ON <Cond>`.
    Condition,
    /// The list of an `IN` predicate.
    InList,
    /// A table in `FROM` or `JOIN`.
    Table,
}

impl SubstitutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubstitutionType::Predicand => "predicand",
            SubstitutionType::Condition => "condition",
            SubstitutionType::InList => "in_list",
            SubstitutionType::Table => "table",
        }
    }
}

impl fmt::Display for SubstitutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A second assignment that disagreed with the stored type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConflict {
    pub name: String,
    pub previous: SubstitutionType,
    pub attempted: SubstitutionType,
    /// Type stored after the policy was applied.
    pub kept: SubstitutionType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstitutionRegistry {
    entries: BTreeMap<String, SubstitutionType>,
}

impl SubstitutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` as `ty`.
    ///
    /// Assigning the type a name already has changes nothing. A different
    /// type yields a [`RegistryConflict`] and the stored type follows
    /// `policy`; under `Reject` the previous type is kept and the caller is
    /// expected to fail the statement.
    pub fn assign(
        &mut self,
        name: &str,
        ty: SubstitutionType,
        policy: ConflictPolicy,
    ) -> Option<RegistryConflict> {
        let previous = match self.entries.get(name) {
            None => {
                self.entries.insert(name.to_string(), ty);
                return None;
            }
            Some(previous) if *previous == ty => return None,
            Some(previous) => *previous,
        };

        let kept = match policy {
            ConflictPolicy::KeepLast => ty,
            ConflictPolicy::KeepFirst | ConflictPolicy::Reject => previous,
        };
        self.entries.insert(name.to_string(), kept);

        Some(RegistryConflict {
            name: name.to_string(),
            previous,
            attempted: ty,
            kept,
        })
    }

    pub fn get(&self, name: &str) -> Option<SubstitutionType> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SubstitutionType)> {
        self.entries.iter().map(|(name, ty)| (name.as_str(), *ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_type_is_idempotent() {
        let mut registry = SubstitutionRegistry::new();
        registry.assign("<A>", SubstitutionType::Predicand, ConflictPolicy::KeepLast);
        let second = registry.assign("<A>", SubstitutionType::Predicand, ConflictPolicy::KeepLast);
        assert!(second.is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("<A>"), Some(SubstitutionType::Predicand));
    }

    #[test]
    fn test_keep_first_preserves_original() {
        let mut registry = SubstitutionRegistry::new();
        registry.assign("<A>", SubstitutionType::Predicand, ConflictPolicy::KeepFirst);
        let conflict = registry
            .assign("<A>", SubstitutionType::Condition, ConflictPolicy::KeepFirst)
            .unwrap();
        assert_eq!(conflict.kept, SubstitutionType::Predicand);
        assert_eq!(registry.get("<A>"), Some(SubstitutionType::Predicand));
    }

    #[test]
    fn test_reject_keeps_previous_and_reports() {
        let mut registry = SubstitutionRegistry::new();
        registry.assign("<T>", SubstitutionType::Table, ConflictPolicy::Reject);
        let conflict = registry
            .assign("<T>", SubstitutionType::InList, ConflictPolicy::Reject)
            .unwrap();
        assert_eq!(conflict.previous, SubstitutionType::Table);
        assert_eq!(conflict.attempted, SubstitutionType::InList);
        assert_eq!(registry.get("<T>"), Some(SubstitutionType::Table));
    }

    #[test]
    fn test_serialises_as_plain_map() {
        let mut registry = SubstitutionRegistry::new();
        registry.assign("<OnJoinCondition>", SubstitutionType::Condition, ConflictPolicy::KeepLast);
        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(json, r#"{"<OnJoinCondition>":"condition"}"#);
    }
}
