//! Presentation model produced by the config diff classifier

use serde::{Deserialize, Serialize};

use crate::models::config::ConfigSnapshot;

/// Outcome of comparing one config resource across two deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffState {
    NoDiff,
    HasDiff,
    /// Present in the current deployment only.
    Added,
    /// Present in the compared-against deployment only.
    Deleted,
}

impl DiffState {
    /// Whether the resource differs between the two deployments at all.
    pub fn is_changed(&self) -> bool {
        !matches!(self, DiffState::NoDiff)
    }
}

/// One entry of the navigable config comparison list.
///
/// `primary_config` is the current deployment's snapshot, `secondary_config`
/// the one it is compared against. The absent side of an added or deleted
/// resource is `None`, never an empty snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfigListItem {
    /// Stable resource key, e.g. `configmap/app-settings`.
    pub id: String,

    pub title: String,

    pub primary_config: Option<ConfigSnapshot>,

    pub secondary_config: Option<ConfigSnapshot>,

    pub diff_state: DiffState,

    pub group_header: Option<String>,
}

/// Items of one section of the comparison list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDiffGroup {
    pub header: String,
    pub items: Vec<DeploymentConfigListItem>,
}

/// Bucket label for items that carry no group header of their own.
pub const UNGROUPED_HEADER: &str = "Ungrouped";

/// Group items by their header, preserving first-seen group order. Items
/// without a header land in a trailing [`UNGROUPED_HEADER`] bucket.
pub fn group_items(items: Vec<DeploymentConfigListItem>) -> Vec<ConfigDiffGroup> {
    let mut groups: Vec<ConfigDiffGroup> = Vec::new();
    let mut ungrouped: Vec<DeploymentConfigListItem> = Vec::new();

    for item in items {
        match item.group_header.clone() {
            Some(header) => match groups.iter_mut().find(|g| g.header == header) {
                Some(group) => group.items.push(item),
                None => groups.push(ConfigDiffGroup {
                    header,
                    items: vec![item],
                }),
            },
            None => ungrouped.push(item),
        }
    }

    if !ungrouped.is_empty() {
        groups.push(ConfigDiffGroup {
            header: UNGROUPED_HEADER.to_string(),
            items: ungrouped,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, group_header: Option<&str>) -> DeploymentConfigListItem {
        DeploymentConfigListItem {
            id: id.to_string(),
            title: id.to_string(),
            primary_config: Some(ConfigSnapshot::default()),
            secondary_config: None,
            diff_state: DiffState::Added,
            group_header: group_header.map(str::to_string),
        }
    }

    #[test]
    fn test_groups_keep_first_seen_order_with_ungrouped_last() {
        let groups = group_items(vec![
            item("a", Some("Secrets")),
            item("b", None),
            item("c", Some("ConfigMaps")),
            item("d", Some("Secrets")),
        ]);

        let headers: Vec<&str> = groups.iter().map(|g| g.header.as_str()).collect();
        assert_eq!(headers, vec!["Secrets", "ConfigMaps", UNGROUPED_HEADER]);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[2].items[0].id, "b");
    }

    #[test]
    fn test_no_ungrouped_bucket_when_every_item_has_a_header() {
        let groups = group_items(vec![item("a", Some("Secrets"))]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].header, "Secrets");
    }
}
