//! Polling worker for deployment status
//!
//! One poller per watched deployment. Each tick fetches the timeline,
//! reduces it to a stage breakdown, and publishes the result as a whole
//! new model on a watch channel; consumers only ever see complete models,
//! never partial updates. The loop stops itself once the deployment
//! reaches a terminal status.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::api::timeline::{TimelineQuery, TimelineSource};
use crate::breakdown::model::DeploymentStatusBreakdown;
use crate::breakdown::reducer::reduce;
use crate::models::timeline::{AggregateStatus, DeploymentAppType, DeploymentTimeline};
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Status poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval while the deployment is actively transitioning
    pub fast_interval: Duration,

    /// Polling interval for any other unsettled status
    pub slow_interval: Duration,

    /// Initial delay before the first fetch
    pub initial_delay: Duration,

    /// Backoff between failed fetches
    pub cooldown: CooldownOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(10),
            slow_interval: Duration::from_secs(30),
            initial_delay: Duration::ZERO,
            cooldown: CooldownOptions::default(),
        }
    }
}

impl Options {
    /// The wait before the next poll for a deployment in `status`, or
    /// `None` when the status is terminal and polling should stop.
    pub fn interval_for(&self, status: AggregateStatus) -> Option<Duration> {
        if status.is_terminal() {
            None
        } else if status.is_transitioning() {
            Some(self.fast_interval)
        } else {
            Some(self.slow_interval)
        }
    }
}

/// The deployment a poller is watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub query: TimelineQuery,
    pub app_type: DeploymentAppType,
    pub is_virtual_environment: bool,
}

/// One complete published view of a deployment's status.
///
/// Models are replaced wholesale on every successful fetch; `generation`
/// increases monotonically so consumers can tell a newer model from a
/// re-delivered one.
#[derive(Debug, Clone)]
pub struct StatusModel {
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub timeline: DeploymentTimeline,
    pub breakdown: DeploymentStatusBreakdown,
}

impl StatusModel {
    pub fn status(&self) -> AggregateStatus {
        self.timeline.status
    }
}

/// Run the status poller worker
///
/// Publishes into `model_tx` until the deployment settles, the shutdown
/// signal fires, or the model channel loses all receivers. A unit on
/// `refresh_rx` forces an immediate poll; if a fetch is already in flight
/// it is dropped and restarted so the freshest request wins.
pub async fn run<T, S, F>(
    options: &Options,
    source: &T,
    target: &WatchTarget,
    model_tx: watch::Sender<Option<StatusModel>>,
    mut refresh_rx: mpsc::Receiver<()>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    T: TimelineSource + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Status poller starting...");

    // Initial delay
    sleep_fn(options.initial_delay).await;

    let mut generation: u64 = 0;
    let mut err_streak: u32 = 0;
    // Once the refresh channel closes its select arms are disabled rather
    // than looping on a closed receiver.
    let mut refresh_open = true;

    loop {
        let result = 'fetch: loop {
            let fetch = source.fetch_timeline(&target.query);
            tokio::pin!(fetch);

            loop {
                tokio::select! {
                    _ = &mut shutdown_signal => {
                        info!("Status poller shutting down...");
                        return;
                    }
                    result = &mut fetch => break 'fetch result,
                    request = refresh_rx.recv(), if refresh_open => {
                        match request {
                            Some(()) => {
                                debug!("Refresh requested; restarting in-flight fetch");
                                continue 'fetch;
                            }
                            None => refresh_open = false,
                        }
                    }
                }
            }
        };

        let wait = match result {
            Ok(timeline) => {
                err_streak = 0;
                generation += 1;

                let status = timeline.status;
                let breakdown = reduce(&timeline, target.app_type, target.is_virtual_environment);
                let model = StatusModel {
                    generation,
                    fetched_at: Utc::now(),
                    timeline,
                    breakdown,
                };
                model_tx.send_replace(Some(model));
                debug!("Published status model generation {} ({:?})", generation, status);

                match options.interval_for(status) {
                    Some(interval) => interval,
                    None => {
                        info!("Deployment settled with status {:?}; status poller finishing", status);
                        return;
                    }
                }
            }
            Err(e) => {
                err_streak += 1;
                let backoff = calc_exp_backoff(&options.cooldown, err_streak);
                error!(
                    "Timeline fetch failed (attempt {}), retrying in {:?}: {}",
                    err_streak, backoff, e
                );
                backoff
            }
        };

        let sleep = sleep_fn(wait);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut shutdown_signal => {
                    info!("Status poller shutting down...");
                    return;
                }
                _ = &mut sleep => break,
                request = refresh_rx.recv(), if refresh_open => {
                    match request {
                        Some(()) => {
                            debug!("Refresh requested; polling now");
                            break;
                        }
                        None => refresh_open = false,
                    }
                }
            }
        }
    }
}

/// Handle owning one status poller task.
pub struct StatusWatcher {
    model_rx: watch::Receiver<Option<StatusModel>>,
    refresh_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl StatusWatcher {
    /// Spawn a poller task for one deployment target.
    pub fn spawn<T>(options: Options, source: Arc<T>, target: WatchTarget) -> Self
    where
        T: TimelineSource + 'static,
    {
        let (model_tx, model_rx) = watch::channel(None);
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let shutdown_signal = Box::pin(async move {
                let _ = shutdown_rx.changed().await;
            });
            run(
                &options,
                source.as_ref(),
                &target,
                model_tx,
                refresh_rx,
                tokio::time::sleep,
                shutdown_signal,
            )
            .await;
        });

        Self {
            model_rx,
            refresh_tx,
            shutdown_tx,
            task: Some(task),
        }
    }

    /// A receiver over the published models. Starts at `None` until the
    /// first successful fetch; closes when the poller finishes.
    pub fn subscribe(&self) -> watch::Receiver<Option<StatusModel>> {
        self.model_rx.clone()
    }

    /// The most recently published model, if any.
    pub fn latest(&self) -> Option<StatusModel> {
        self.model_rx.borrow().clone()
    }

    /// Ask the poller to fetch now instead of waiting out the interval.
    ///
    /// Requests coalesce: one queued request already means "poll again as
    /// soon as possible", so further ones are dropped.
    pub fn refresh_now(&self) {
        let _ = self.refresh_tx.try_send(());
    }

    /// Whether the poller task has stopped (settled deployment or shutdown).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Signal shutdown and wait for the poller task to wind down.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StatusWatcher {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
