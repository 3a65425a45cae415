//! Deployment configuration models
//!
//! Canonical form of a per-deployment config snapshot. Resources are kept
//! in display order: deployment template first, then config maps, then
//! secrets. Each resource carries a stable key so two snapshots can be
//! matched up resource by resource.

use std::collections::BTreeMap;

use orchestrator_api::models::{
    CodeEditorValueDto, ConfigResourceDto, ConfigSnapshotResponseDto, ConfigValueDto,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scalar display field of a config resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigValue {
    pub display_name: String,
    pub value: serde_json::Value,
}

impl From<ConfigValueDto> for ConfigValue {
    fn from(dto: ConfigValueDto) -> Self {
        Self {
            display_name: dto.display_name.unwrap_or_default(),
            value: dto.value,
        }
    }
}

/// Document body of a config resource, serialized JSON as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeEditorValue {
    pub value: String,

    /// Body with scope variables substituted, when the backend resolved it.
    pub resolved_value: Option<String>,

    /// Scope-variable values in effect at deployment time.
    pub variable_snapshot: BTreeMap<String, String>,
}

impl CodeEditorValue {
    /// The document to show and compare. Falls back to the raw body when
    /// resolution was requested but the backend sent none.
    pub fn effective_document(&self, resolve_variables: bool) -> &str {
        if resolve_variables {
            self.resolved_value.as_deref().unwrap_or(&self.value)
        } else {
            &self.value
        }
    }
}

impl From<CodeEditorValueDto> for CodeEditorValue {
    fn from(dto: CodeEditorValueDto) -> Self {
        Self {
            value: dto.value.unwrap_or_default(),
            resolved_value: dto.resolved_value,
            variable_snapshot: dto.variable_snapshot.unwrap_or_default(),
        }
    }
}

/// Everything captured for one resource at deployment time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub values: BTreeMap<String, ConfigValue>,
    pub code_editor_value: Option<CodeEditorValue>,
}

impl From<ConfigResourceDto> for ConfigSnapshot {
    fn from(dto: ConfigResourceDto) -> Self {
        Self {
            values: dto
                .values
                .into_iter()
                .map(|(k, v)| (k, ConfigValue::from(v)))
                .collect(),
            code_editor_value: dto.code_editor_value.map(CodeEditorValue::from),
        }
    }
}

/// Section a config resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigGroup {
    DeploymentTemplate,
    ConfigMaps,
    Secrets,
}

impl ConfigGroup {
    pub fn header(&self) -> &'static str {
        match self {
            ConfigGroup::DeploymentTemplate => "Deployment Template",
            ConfigGroup::ConfigMaps => "ConfigMaps",
            ConfigGroup::Secrets => "Secrets",
        }
    }
}

/// One config resource with its stable lookup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResource {
    /// `deployment-template`, `configmap/<name>` or `secret/<name>`.
    pub key: String,
    pub title: String,
    pub group: ConfigGroup,
    pub snapshot: ConfigSnapshot,
}

/// Ordered config snapshot of one deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigCollection {
    pub resources: Vec<ConfigResource>,
    pub is_app_admin: bool,
}

impl ConfigCollection {
    pub fn get(&self, key: &str) -> Option<&ConfigResource> {
        self.resources.iter().find(|r| r.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl From<ConfigSnapshotResponseDto> for ConfigCollection {
    fn from(dto: ConfigSnapshotResponseDto) -> Self {
        let mut resources = Vec::new();

        if let Some(template) = dto.deployment_template {
            resources.push(ConfigResource {
                key: "deployment-template".to_string(),
                title: "Deployment Template".to_string(),
                group: ConfigGroup::DeploymentTemplate,
                snapshot: ConfigSnapshot::from(template),
            });
        }

        for cm in dto.config_map_data.map(|l| l.config_data).unwrap_or_default() {
            match cm.name.clone().filter(|n| !n.is_empty()) {
                Some(name) => resources.push(ConfigResource {
                    key: format!("configmap/{name}"),
                    title: name,
                    group: ConfigGroup::ConfigMaps,
                    snapshot: ConfigSnapshot::from(cm),
                }),
                None => debug!("skipping config map without a name"),
            }
        }

        for secret in dto.secrets_data.map(|l| l.config_data).unwrap_or_default() {
            match secret.name.clone().filter(|n| !n.is_empty()) {
                Some(name) => resources.push(ConfigResource {
                    key: format!("secret/{name}"),
                    title: name,
                    group: ConfigGroup::Secrets,
                    snapshot: ConfigSnapshot::from(secret),
                }),
                None => debug!("skipping secret without a name"),
            }
        }

        Self {
            resources,
            is_app_admin: dto.is_app_admin,
        }
    }
}
