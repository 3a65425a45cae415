//! Classifies config resources across two deployments
//!
//! Classification is computed fresh from two immutable snapshots; a toggle
//! change (variable resolution) therefore requires re-running `classify`,
//! not just re-rendering, since resolution can flip a resource between
//! changed and unchanged.

use serde_json::Value;
use tracing::debug;

use crate::diff::model::{DeploymentConfigListItem, DiffState};
use crate::diff::variables::resolved_document;
use crate::models::config::{CodeEditorValue, ConfigCollection, ConfigResource, ConfigSnapshot};

/// How snapshots are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffCompareOptions {
    /// Compare and render resolved documents instead of raw ones.
    pub resolve_variables: bool,
}

/// Compare the current deployment's config against a previous one.
///
/// With no previous snapshot (first deployment, or the backend kept none)
/// every current resource is `Added`. Otherwise the union of both resource
/// sets is classified: current resources first in their own order, then
/// resources only the previous deployment had, in previous order.
pub fn classify(
    current: &ConfigCollection,
    previous: Option<&ConfigCollection>,
    options: &DiffCompareOptions,
) -> Vec<DeploymentConfigListItem> {
    let Some(previous) = previous else {
        debug!("No previous config snapshot; classifying everything as added");
        return current.resources.iter().map(added_item).collect();
    };

    let mut items: Vec<DeploymentConfigListItem> =
        Vec::with_capacity(current.resources.len() + previous.resources.len());

    for resource in &current.resources {
        match previous.get(&resource.key) {
            Some(prev) => {
                let diff_state = if snapshots_equal(&resource.snapshot, &prev.snapshot, options) {
                    DiffState::NoDiff
                } else {
                    DiffState::HasDiff
                };
                items.push(DeploymentConfigListItem {
                    id: resource.key.clone(),
                    title: resource.title.clone(),
                    primary_config: Some(resource.snapshot.clone()),
                    secondary_config: Some(prev.snapshot.clone()),
                    diff_state,
                    group_header: Some(resource.group.header().to_string()),
                });
            }
            None => items.push(added_item(resource)),
        }
    }

    for resource in &previous.resources {
        if current.get(&resource.key).is_none() {
            items.push(DeploymentConfigListItem {
                id: resource.key.clone(),
                title: resource.title.clone(),
                primary_config: None,
                secondary_config: Some(resource.snapshot.clone()),
                diff_state: DiffState::Deleted,
                group_header: Some(resource.group.header().to_string()),
            });
        }
    }

    items
}

fn added_item(resource: &ConfigResource) -> DeploymentConfigListItem {
    DeploymentConfigListItem {
        id: resource.key.clone(),
        title: resource.title.clone(),
        primary_config: Some(resource.snapshot.clone()),
        secondary_config: None,
        diff_state: DiffState::Added,
        group_header: Some(resource.group.header().to_string()),
    }
}

fn snapshots_equal(
    current: &ConfigSnapshot,
    previous: &ConfigSnapshot,
    options: &DiffCompareOptions,
) -> bool {
    current.values == previous.values
        && documents_equal(
            current.code_editor_value.as_ref(),
            previous.code_editor_value.as_ref(),
            options.resolve_variables,
        )
}

/// Structural equality of the effective document bodies. Bodies that fail
/// to parse as JSON fall back to exact string comparison. A document on one
/// side only counts as equal when it is empty.
fn documents_equal(
    current: Option<&CodeEditorValue>,
    previous: Option<&CodeEditorValue>,
    resolve_variables: bool,
) -> bool {
    match (current, previous) {
        (None, None) => true,
        (Some(editor), None) | (None, Some(editor)) => {
            resolved_document(editor, resolve_variables).is_empty()
        }
        (Some(current), Some(previous)) => {
            let current_doc = resolved_document(current, resolve_variables);
            let previous_doc = resolved_document(previous, resolve_variables);
            match (
                serde_json::from_str::<Value>(&current_doc),
                serde_json::from_str::<Value>(&previous_doc),
            ) {
                (Ok(current_tree), Ok(previous_tree)) => current_tree == previous_tree,
                _ => current_doc == previous_doc,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ConfigGroup;
    use std::collections::BTreeMap;

    fn editor(value: &str) -> CodeEditorValue {
        CodeEditorValue {
            value: value.to_string(),
            resolved_value: None,
            variable_snapshot: BTreeMap::new(),
        }
    }

    fn resource(key: &str, group: ConfigGroup, document: &str) -> ConfigResource {
        ConfigResource {
            key: key.to_string(),
            title: key.to_string(),
            group,
            snapshot: ConfigSnapshot {
                values: BTreeMap::new(),
                code_editor_value: Some(editor(document)),
            },
        }
    }

    fn collection(resources: Vec<ConfigResource>) -> ConfigCollection {
        ConfigCollection {
            resources,
            is_app_admin: false,
        }
    }

    #[test]
    fn test_union_order_is_current_then_previous_only() {
        let current = collection(vec![
            resource("deployment-template", ConfigGroup::DeploymentTemplate, "{}"),
            resource("configmap/new", ConfigGroup::ConfigMaps, "{}"),
        ]);
        let previous = collection(vec![
            resource("deployment-template", ConfigGroup::DeploymentTemplate, "{}"),
            resource("secret/old", ConfigGroup::Secrets, "{}"),
        ]);

        let items = classify(&current, Some(&previous), &DiffCompareOptions::default());
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["deployment-template", "configmap/new", "secret/old"]);
        assert_eq!(items[0].diff_state, DiffState::NoDiff);
        assert_eq!(items[1].diff_state, DiffState::Added);
        assert_eq!(items[2].diff_state, DiffState::Deleted);
        assert!(items[1].secondary_config.is_none());
        assert!(items[2].primary_config.is_none());
    }

    #[test]
    fn test_structural_json_equality_ignores_formatting() {
        let current = collection(vec![resource(
            "deployment-template",
            ConfigGroup::DeploymentTemplate,
            "{\"replicas\": 2,\n  \"image\": \"app\"}",
        )]);
        let previous = collection(vec![resource(
            "deployment-template",
            ConfigGroup::DeploymentTemplate,
            r#"{"image":"app","replicas":2}"#,
        )]);

        let items = classify(&current, Some(&previous), &DiffCompareOptions::default());
        assert_eq!(items[0].diff_state, DiffState::NoDiff);
    }

    #[test]
    fn test_non_json_bodies_compare_exactly() {
        let current = collection(vec![resource("configmap/a", ConfigGroup::ConfigMaps, "k=v\n")]);
        let previous = collection(vec![resource("configmap/a", ConfigGroup::ConfigMaps, "k=v")]);

        let items = classify(&current, Some(&previous), &DiffCompareOptions::default());
        assert_eq!(items[0].diff_state, DiffState::HasDiff);
    }

    #[test]
    fn test_scalar_values_participate_in_the_diff() {
        let mut current = collection(vec![resource("configmap/a", ConfigGroup::ConfigMaps, "{}")]);
        let previous = collection(vec![resource("configmap/a", ConfigGroup::ConfigMaps, "{}")]);
        current.resources[0].snapshot.values.insert(
            "mountPath".to_string(),
            crate::models::config::ConfigValue {
                display_name: "Mount path".to_string(),
                value: serde_json::json!("/etc/app"),
            },
        );

        let items = classify(&current, Some(&previous), &DiffCompareOptions::default());
        assert_eq!(items[0].diff_state, DiffState::HasDiff);
    }

    #[test]
    fn test_variable_resolution_can_flip_the_state() {
        let mut current = collection(vec![resource(
            "deployment-template",
            ConfigGroup::DeploymentTemplate,
            r#"{"tag":"@{{tag}}"}"#,
        )]);
        let previous = collection(vec![resource(
            "deployment-template",
            ConfigGroup::DeploymentTemplate,
            r#"{"tag":"@{{tag}}"}"#,
        )]);
        // Same raw bodies, but this run deployed with a different tag value.
        current.resources[0]
            .snapshot
            .code_editor_value
            .as_mut()
            .unwrap()
            .variable_snapshot
            .insert("tag".to_string(), "v2".to_string());

        let raw = classify(&current, Some(&previous), &DiffCompareOptions::default());
        assert_eq!(raw[0].diff_state, DiffState::NoDiff);

        let resolved = classify(
            &current,
            Some(&previous),
            &DiffCompareOptions {
                resolve_variables: true,
            },
        );
        assert_eq!(resolved[0].diff_state, DiffState::HasDiff);
    }

    #[test]
    fn test_missing_document_equals_empty_document() {
        let current = collection(vec![resource("configmap/a", ConfigGroup::ConfigMaps, "")]);
        let mut previous = collection(vec![resource("configmap/a", ConfigGroup::ConfigMaps, "")]);
        previous.resources[0].snapshot.code_editor_value = None;

        let items = classify(&current, Some(&previous), &DiffCompareOptions::default());
        assert_eq!(items[0].diff_state, DiffState::NoDiff);
    }
}
