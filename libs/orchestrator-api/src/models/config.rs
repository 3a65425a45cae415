//! Deployment configuration snapshot wire types
//!
//! A snapshot captures the configuration a specific deployment ran with:
//! the deployment template plus the config maps and secrets that were
//! mounted. Document bodies travel as strings of serialized JSON inside
//! `codeEditorValue`; scalar display fields travel in `values`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response of the per-deployment config snapshot endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshotResponseDto {
    #[serde(default, alias = "deployment_template")]
    pub deployment_template: Option<ConfigResourceDto>,

    #[serde(default, alias = "config_map_data")]
    pub config_map_data: Option<ConfigListDto>,

    #[serde(default, alias = "secrets_data")]
    pub secrets_data: Option<ConfigListDto>,

    #[serde(default, alias = "is_app_admin")]
    pub is_app_admin: bool,
}

/// Grouping wrapper the backend uses for config map / secret lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigListDto {
    #[serde(default, alias = "config_data")]
    pub config_data: Vec<ConfigResourceDto>,
}

/// One configuration resource (template, config map or secret).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResourceDto {
    pub name: Option<String>,

    /// Scalar fields rendered as a key/value table.
    #[serde(default)]
    pub values: BTreeMap<String, ConfigValueDto>,

    #[serde(default, alias = "code_editor_value")]
    pub code_editor_value: Option<CodeEditorValueDto>,
}

/// One scalar display field of a config resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigValueDto {
    #[serde(default, alias = "display_name")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub value: serde_json::Value,
}

/// Serialized document body of a config resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEditorValueDto {
    #[serde(default, alias = "display_name")]
    pub display_name: Option<String>,

    /// Raw document, serialized JSON as a string.
    pub value: Option<String>,

    /// Raw document with scope variables substituted; present only when the
    /// backend was asked to resolve.
    #[serde(default, alias = "resolved_value")]
    pub resolved_value: Option<String>,

    /// Scope-variable values in effect at deployment time.
    #[serde(default, alias = "variable_snapshot")]
    pub variable_snapshot: Option<BTreeMap<String, String>>,
}
