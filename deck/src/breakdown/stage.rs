//! Breakdown stages and the status-to-stage mapping

use serde::{Deserialize, Serialize};

use crate::models::timeline::{DeploymentAppType, TimelineStatus};

/// Fixed stages of the deployment progress view.
///
/// Which stages apply depends on how the app deploys; see [`stage_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeployStage {
    Initiated,
    GitCommit,
    ArgocdSync,
    KubectlApply,
    AppHealth,
    HelmPackageGenerated,
    HelmManifestPushed,
}

impl DeployStage {
    /// Stable key, matching the wire status family it aggregates.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Initiated => "DEPLOYMENT_INITIATED",
            Self::GitCommit => "GIT_COMMIT",
            Self::ArgocdSync => "ARGOCD_SYNC",
            Self::KubectlApply => "KUBECTL_APPLY",
            Self::AppHealth => "APP_HEALTH",
            Self::HelmPackageGenerated => "HELM_PACKAGE_GENERATED",
            Self::HelmManifestPushed => "HELM_MANIFEST_PUSHED_TO_HELM_REPO",
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            Self::Initiated => "Deployment initiated",
            Self::GitCommit => "Push manifest to git",
            Self::ArgocdSync => "Synced with Argo CD",
            Self::KubectlApply => "Apply manifest to Kubernetes",
            Self::AppHealth => "Propagate manifest to Kubernetes resources",
            Self::HelmPackageGenerated => "Helm package generated",
            Self::HelmManifestPushed => "Helm manifest pushed to repository",
        }
    }
}

const ARGOCD_PATH: &[DeployStage] = &[
    DeployStage::Initiated,
    DeployStage::GitCommit,
    DeployStage::ArgocdSync,
    DeployStage::KubectlApply,
    DeployStage::AppHealth,
];

const HELM_VIRTUAL_PATH: &[DeployStage] = &[
    DeployStage::Initiated,
    DeployStage::HelmPackageGenerated,
    DeployStage::HelmManifestPushed,
];

const HELM_PATH: &[DeployStage] = &[DeployStage::Initiated];

/// The ordered stage set applicable to one deployment.
///
/// GitOps apps walk the full manifest pipeline. Helm apps targeting a
/// virtual environment only package and push; plain Helm installs report
/// no per-stage timeline beyond the trigger itself.
pub fn stage_path(app_type: DeploymentAppType, is_virtual_environment: bool) -> &'static [DeployStage] {
    match (app_type, is_virtual_environment) {
        (DeploymentAppType::ArgoCd, _) => ARGOCD_PATH,
        (DeploymentAppType::Helm, true) => HELM_VIRTUAL_PATH,
        (DeploymentAppType::Helm, false) => HELM_PATH,
    }
}

/// Many-to-one mapping from wire status codes onto breakdown stages.
pub fn stage_for(status: TimelineStatus) -> DeployStage {
    match status {
        TimelineStatus::DeploymentInitiated => DeployStage::Initiated,
        TimelineStatus::GitCommit | TimelineStatus::GitCommitFailed => DeployStage::GitCommit,
        TimelineStatus::ArgocdSync | TimelineStatus::ArgocdSyncFailed => DeployStage::ArgocdSync,
        TimelineStatus::KubectlApplyStarted
        | TimelineStatus::KubectlApplySynced
        | TimelineStatus::KubectlApplyFailed => DeployStage::KubectlApply,
        TimelineStatus::Healthy
        | TimelineStatus::Degraded
        | TimelineStatus::DeploymentTimedOut
        | TimelineStatus::UnableToFetchStatus
        | TimelineStatus::DeploymentSuperseded => DeployStage::AppHealth,
        TimelineStatus::HelmPackageGenerated | TimelineStatus::HelmPackageGenerationFailed => {
            DeployStage::HelmPackageGenerated
        }
        TimelineStatus::HelmManifestPushedToHelmRepo | TimelineStatus::HelmManifestPushFailed => {
            DeployStage::HelmManifestPushed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_paths_are_mutually_exclusive_branches() {
        let argo = stage_path(DeploymentAppType::ArgoCd, false);
        assert_eq!(argo.len(), 5);
        assert!(!argo.contains(&DeployStage::HelmPackageGenerated));

        let helm_virtual = stage_path(DeploymentAppType::Helm, true);
        assert_eq!(helm_virtual.len(), 3);
        assert!(!helm_virtual.contains(&DeployStage::GitCommit));

        let helm = stage_path(DeploymentAppType::Helm, false);
        assert_eq!(helm, &[DeployStage::Initiated]);
    }

    #[test]
    fn test_failure_codes_share_their_stage() {
        assert_eq!(stage_for(TimelineStatus::GitCommit), DeployStage::GitCommit);
        assert_eq!(stage_for(TimelineStatus::GitCommitFailed), DeployStage::GitCommit);
        assert_eq!(stage_for(TimelineStatus::DeploymentTimedOut), DeployStage::AppHealth);
        assert_eq!(
            stage_for(TimelineStatus::KubectlApplyStarted),
            DeployStage::KubectlApply
        );
    }
}
