//! Folds timeline events into the stage breakdown
//!
//! The reduction is a pure function of one timeline snapshot. It never
//! merges with a previous breakdown; callers replace the whole model on
//! every poll so a timeline batch and its derived rows always agree.

use crate::breakdown::model::{DeploymentStatusBreakdown, IconState, StageRow};
use crate::breakdown::stage::{stage_for, stage_path, DeployStage};
use crate::models::timeline::{
    AggregateStatus, DeploymentAppType, DeploymentTimeline, TimelineEvent, TimelineStatus,
};

/// Whether the aggregate status says the run stopped without success.
fn run_failed(status: AggregateStatus) -> bool {
    matches!(
        status,
        AggregateStatus::Failed
            | AggregateStatus::Error
            | AggregateStatus::Cancelled
            | AggregateStatus::Aborted
            | AggregateStatus::Degraded
            | AggregateStatus::TimedOut
    )
}

/// Build the stage breakdown for one timeline snapshot.
///
/// Exactly one row is produced per stage applicable to the app type;
/// inapplicable stages are omitted, never present-but-empty. A run that
/// never reaches a terminal status keeps rendering as in-progress, which
/// is not an error.
pub fn reduce(
    timeline: &DeploymentTimeline,
    app_type: DeploymentAppType,
    is_virtual_environment: bool,
) -> DeploymentStatusBreakdown {
    let path = stage_path(app_type, is_virtual_environment);

    // Latest event per stage. Events are scanned in received order and an
    // equal timestamp replaces the earlier pick, so for tied timestamps the
    // later received event wins.
    let mut latest: Vec<Option<&TimelineEvent>> = vec![None; path.len()];
    for event in &timeline.events {
        let stage = stage_for(event.status);
        let Some(pos) = path.iter().position(|s| *s == stage) else {
            continue;
        };
        match latest[pos] {
            Some(prev) if event.time < prev.time => {}
            _ => latest[pos] = Some(event),
        }
    }

    let settled = timeline.is_settled();
    let failed_run = run_failed(timeline.status);
    let has_failure_event = latest
        .iter()
        .flatten()
        .any(|e| e.status.is_failure());
    let last_evented = latest.iter().rposition(Option::is_some);

    // The frontier is the first stage past everything the backend reported.
    // It only exists while no stage has failed outright.
    let frontier = match last_evented {
        _ if has_failure_event => None,
        Some(i) => Some(i + 1),
        None => Some(0),
    };

    let rows = path
        .iter()
        .enumerate()
        .map(|(i, &stage)| {
            build_row(RowInput {
                stage,
                event: latest[i],
                is_frontier: frontier == Some(i),
                later_evented: last_evented.map(|l| l > i).unwrap_or(false),
                is_last: i + 1 == path.len(),
                settled,
                failed_run,
                timeline,
            })
        })
        .collect();

    DeploymentStatusBreakdown::new(rows)
}

struct RowInput<'a> {
    stage: DeployStage,
    event: Option<&'a TimelineEvent>,
    is_frontier: bool,
    later_evented: bool,
    is_last: bool,
    settled: bool,
    failed_run: bool,
    timeline: &'a DeploymentTimeline,
}

fn build_row(input: RowInput<'_>) -> StageRow {
    let RowInput {
        stage,
        event,
        is_frontier,
        later_evented,
        is_last,
        settled,
        failed_run,
        timeline,
    } = input;

    let (icon, display_sub_text, time, timeline_status) = match event {
        Some(e) => {
            let icon = if e.status.is_failure() {
                IconState::Failed
            } else if e.status == TimelineStatus::KubectlApplyStarted {
                // A started marker with nothing after it is the live frontier.
                if later_evented {
                    IconState::Success
                } else if failed_run {
                    IconState::Failed
                } else if settled {
                    IconState::Success
                } else {
                    IconState::InProgress
                }
            } else {
                IconState::Success
            };
            (icon, e.detail.clone(), Some(e.time), Some(e.status))
        }
        None if stage == DeployStage::Initiated
            && (timeline.started_on.is_some() || !timeline.events.is_empty()) =>
        {
            // The trigger itself has no event of its own on older backends.
            (IconState::Success, String::new(), timeline.started_on, None)
        }
        None if is_frontier => {
            if failed_run {
                (
                    IconState::Failed,
                    timeline.status.as_str().to_string(),
                    None,
                    None,
                )
            } else if settled {
                (IconState::Waiting, String::new(), None, None)
            } else {
                (IconState::InProgress, String::new(), None, None)
            }
        }
        None => (IconState::Waiting, String::new(), None, None),
    };

    let resource_details = match (stage, event) {
        (DeployStage::KubectlApply, Some(e)) => e.resources.clone(),
        _ => Vec::new(),
    };
    let kube_list = match (stage, event) {
        (DeployStage::AppHealth, Some(e)) => e.resources.clone(),
        _ => Vec::new(),
    };

    let has_sub_detail = !resource_details.is_empty() || !kube_list.is_empty();
    let is_collapsed =
        !(icon == IconState::Failed || (icon == IconState::InProgress && has_sub_detail));

    StageRow {
        stage,
        icon,
        display_text: stage.display_text().to_string(),
        display_sub_text,
        time,
        is_collapsed,
        hide_vertical_connector: is_last,
        resource_details,
        kube_list,
        timeline_status,
    }
}
