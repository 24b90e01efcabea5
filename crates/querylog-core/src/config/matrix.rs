//! Filter matrix: which call sites are logged and which are suppressed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rule for one call-site group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatrixEntry {
    /// One flag covering every operation of the group.
    Group(bool),
    /// Flags for named operations; unnamed operations are logged.
    Operations(BTreeMap<String, bool>),
}

/// Immutable mapping from call-site group to its logging rule.
///
/// Groups absent from the matrix are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterMatrix {
    groups: BTreeMap<String, MatrixEntry>,
}

impl FilterMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a group-wide flag, replacing any previous rule for the group.
    pub fn with_group(mut self, group: impl Into<String>, log: bool) -> Self {
        self.groups.insert(group.into(), MatrixEntry::Group(log));
        self
    }

    /// Set a flag for one operation of a group.
    ///
    /// A previous group-wide flag for the same group is replaced by a
    /// per-operation rule.
    pub fn with_operation(
        mut self,
        group: impl Into<String>,
        operation: impl Into<String>,
        log: bool,
    ) -> Self {
        let entry = self
            .groups
            .entry(group.into())
            .or_insert_with(|| MatrixEntry::Operations(BTreeMap::new()));
        match entry {
            MatrixEntry::Operations(ops) => {
                ops.insert(operation.into(), log);
            }
            MatrixEntry::Group(_) => {
                *entry = MatrixEntry::Operations(BTreeMap::from([(operation.into(), log)]));
            }
        }
        self
    }

    pub fn get(&self, group: &str) -> Option<&MatrixEntry> {
        self.groups.get(group)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MatrixEntry)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_both_entry_shapes() {
        let matrix: FilterMatrix = serde_yaml::from_str(
            r#"
Reports: false
Users:
  create: false
  fetch: true
"#,
        )
        .unwrap();

        assert_eq!(matrix.get("Reports"), Some(&MatrixEntry::Group(false)));
        match matrix.get("Users") {
            Some(MatrixEntry::Operations(ops)) => {
                assert_eq!(ops.get("create"), Some(&false));
                assert_eq!(ops.get("fetch"), Some(&true));
            }
            other => panic!("unexpected entry: {:?}", other),
        }
        assert!(matrix.get("Orders").is_none());
    }

    #[test]
    fn test_builder_matches_parsed_matrix() {
        let built = FilterMatrix::new()
            .with_group("Reports", false)
            .with_operation("Users", "create", false);
        let parsed: FilterMatrix =
            serde_json::from_str(r#"{"Reports": false, "Users": {"create": false}}"#).unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_with_operation_replaces_group_flag() {
        let matrix = FilterMatrix::new()
            .with_group("Users", false)
            .with_operation("Users", "fetch", true);
        assert_eq!(
            matrix.get("Users"),
            Some(&MatrixEntry::Operations(BTreeMap::from([(
                "fetch".to_string(),
                true
            )])))
        );
    }
}
