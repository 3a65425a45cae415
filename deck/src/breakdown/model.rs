//! Presentation model produced by the timeline reducer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::breakdown::stage::DeployStage;
use crate::models::timeline::{ResourceDetail, TimelineStatus};

/// Icon shown next to a stage row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconState {
    Success,
    Failed,
    InProgress,
    /// The stage has not been reached yet, or the run ended before it.
    Waiting,
}

/// One row of the progress view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRow {
    pub stage: DeployStage,

    pub icon: IconState,

    pub display_text: String,

    /// Backend detail message for the stage, empty when none was reported.
    pub display_sub_text: String,

    pub time: Option<DateTime<Utc>>,

    pub is_collapsed: bool,

    /// Set on the last applicable stage so no connector dangles below it.
    pub hide_vertical_connector: bool,

    /// Per-object sync statuses; populated only on the apply stage.
    pub resource_details: Vec<ResourceDetail>,

    /// Per-object health reports; populated only on the app-health stage.
    pub kube_list: Vec<ResourceDetail>,

    /// The wire status the row was derived from, when the stage had one.
    pub timeline_status: Option<TimelineStatus>,
}

impl StageRow {
    /// Whether the row carries anything to show when expanded.
    pub fn has_sub_detail(&self) -> bool {
        !self.resource_details.is_empty() || !self.kube_list.is_empty()
    }
}

/// Ordered stage rows for one deployment, exactly one per applicable stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStatusBreakdown {
    rows: Vec<StageRow>,
}

impl DeploymentStatusBreakdown {
    pub(crate) fn new(rows: Vec<StageRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[StageRow] {
        &self.rows
    }

    pub fn get(&self, stage: DeployStage) -> Option<&StageRow> {
        self.rows.iter().find(|r| r.stage == stage)
    }

    /// First failed row in stage order, if the run failed anywhere.
    pub fn first_failure(&self) -> Option<&StageRow> {
        self.rows.iter().find(|r| r.icon == IconState::Failed)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
