//! Main application run loop

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use tracing::info;

use crate::api::client::HttpClient;
use crate::api::config::ConfigQuery;
use crate::api::history::HistoryQuery;
use crate::api::log_stream::{self, LogQuery, LogStreamEvent};
use crate::api::timeline::{TimelineQuery, TimelineSource};
use crate::app::options::AppOptions;
use crate::breakdown::model::{DeploymentStatusBreakdown, IconState, StageRow};
use crate::breakdown::reducer::reduce;
use crate::bulk::executor::{self, abort_channel, OperationRunner};
use crate::bulk::store::{BulkOperation, OperationResultStore, OperationState};
use crate::diff::classifier::{classify, DiffCompareOptions};
use crate::diff::model::{group_items, DiffState};
use crate::errors::DeckError;
use crate::models::history::{preceding, DeploymentHistoryRecord};
use crate::models::timeline::DeploymentAppType;
use crate::workers::status_poller::{StatusModel, StatusWatcher, WatchTarget};

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the stage breakdown of a deployment, once or continuously.
    Status { target: WatchTarget, watch: bool },

    /// List recent deployments of a pipeline.
    History { query: HistoryQuery },

    /// Compare a deployment's config against its predecessor.
    Diff {
        app_id: i64,
        env_id: i64,
        app_name: String,
        env_name: String,
        pipeline_id: i64,
        workflow_id: i64,
        base_workflow_id: Option<i64>,
        resolve_variables: bool,
    },

    /// Follow a workflow's build/deploy logs.
    Logs { query: LogQuery },

    /// Abort a running workflow.
    Abort { pipeline_id: i64, workflow_id: i64 },

    /// Trigger a manual sync for one app/env.
    Sync { app_id: i64, env_id: i64 },

    /// Trigger manual syncs across many app/env targets.
    Bulk { operations: Vec<BulkOperation> },
}

impl Command {
    /// Build a command from parsed `--key=value` arguments.
    ///
    /// Route identifiers are validated here, before any request goes out.
    pub fn from_args(args: &HashMap<String, String>) -> Result<Self, DeckError> {
        let command = args.get("command").map(String::as_str).unwrap_or("status");

        match command {
            "status" => Ok(Command::Status {
                target: parse_target(args)?,
                watch: flag(args, "watch"),
            }),
            "history" => Ok(Command::History {
                query: HistoryQuery {
                    app_id: require_i64(args, "app")?,
                    env_id: require_i64(args, "env")?,
                    pipeline_id: require_i64(args, "pipeline")?,
                    offset: get_i64(args, "offset")?.unwrap_or(0) as usize,
                    size: get_i64(args, "size")?.unwrap_or(20) as usize,
                },
            }),
            "diff" => Ok(Command::Diff {
                app_id: require_i64(args, "app")?,
                env_id: require_i64(args, "env")?,
                app_name: require_str(args, "app-name")?,
                env_name: require_str(args, "env-name")?,
                pipeline_id: require_i64(args, "pipeline")?,
                workflow_id: require_i64(args, "workflow")?,
                base_workflow_id: get_i64(args, "base-workflow")?,
                resolve_variables: flag(args, "resolve-variables"),
            }),
            "logs" => Ok(Command::Logs {
                query: LogQuery {
                    pipeline_id: require_i64(args, "pipeline")?,
                    workflow_id: require_i64(args, "workflow")?,
                },
            }),
            "abort" => Ok(Command::Abort {
                pipeline_id: require_i64(args, "pipeline")?,
                workflow_id: require_i64(args, "workflow")?,
            }),
            "sync" => Ok(Command::Sync {
                app_id: require_i64(args, "app")?,
                env_id: require_i64(args, "env")?,
            }),
            "bulk" => Ok(Command::Bulk {
                operations: parse_bulk_targets(&require_str(args, "targets")?)?,
            }),
            other => Err(DeckError::ConfigError(format!("unknown command: {}", other))),
        }
    }
}

fn parse_target(args: &HashMap<String, String>) -> Result<WatchTarget, DeckError> {
    let app_type = match args.get("app-type") {
        Some(raw) => DeploymentAppType::parse(raw).ok_or_else(|| {
            DeckError::ConfigError(format!("unknown app type: {} (argo_cd or helm)", raw))
        })?,
        None => DeploymentAppType::ArgoCd,
    };

    Ok(WatchTarget {
        query: TimelineQuery {
            app_id: require_i64(args, "app")?,
            env_id: require_i64(args, "env")?,
            trigger_id: get_i64(args, "trigger")?,
        },
        app_type,
        is_virtual_environment: flag(args, "virtual-env"),
    })
}

fn require_i64(args: &HashMap<String, String>, key: &'static str) -> Result<i64, DeckError> {
    match args.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| DeckError::ConfigError(format!("--{} must be an integer", key))),
        None => Err(DeckError::MissingField(key)),
    }
}

fn get_i64(args: &HashMap<String, String>, key: &'static str) -> Result<Option<i64>, DeckError> {
    match args.get(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| DeckError::ConfigError(format!("--{} must be an integer", key))),
        None => Ok(None),
    }
}

fn require_str(args: &HashMap<String, String>, key: &'static str) -> Result<String, DeckError> {
    args.get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or(DeckError::MissingField(key))
}

fn flag(args: &HashMap<String, String>, key: &str) -> bool {
    args.get(key).map(String::as_str) == Some("true")
}

/// Parse `--targets=12:3,12:4` into one manual-sync operation per pair.
fn parse_bulk_targets(raw: &str) -> Result<Vec<BulkOperation>, DeckError> {
    let mut operations = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (app, env) = part.split_once(':').ok_or_else(|| {
            DeckError::ConfigError(format!("bad bulk target '{}', expected app:env", part))
        })?;
        let app_id: i64 = app.trim().parse().map_err(|_| {
            DeckError::ConfigError(format!("bad bulk target '{}', app id must be an integer", part))
        })?;
        let env_id: i64 = env.trim().parse().map_err(|_| {
            DeckError::ConfigError(format!("bad bulk target '{}', env id must be an integer", part))
        })?;

        operations.push(BulkOperation {
            id: format!("{}:{}", app_id, env_id),
            name: format!("app {} env {}", app_id, env_id),
            payload: serde_json::json!({ "appId": app_id, "envId": env_id }),
        });
    }

    if operations.is_empty() {
        return Err(DeckError::ConfigError("--targets is empty".to_string()));
    }
    Ok(operations)
}

/// Run the pipedeck CLI
pub async fn run(
    options: AppOptions,
    command: Command,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeckError> {
    info!("Initializing pipedeck...");

    let client = match &options.api_token {
        Some(token) => HttpClient::with_token(&options.backend_base_url, token.clone())?,
        None => HttpClient::new(&options.backend_base_url)?,
    };
    let client = Arc::new(client);

    match command {
        Command::Status { target, watch } => {
            run_status(&options, client, target, watch, shutdown_signal).await
        }
        Command::History { query } => run_history(client, &query).await,
        Command::Diff {
            app_id,
            env_id,
            app_name,
            env_name,
            pipeline_id,
            workflow_id,
            base_workflow_id,
            resolve_variables,
        } => {
            run_diff(
                &options,
                client,
                DiffRequest {
                    app_id,
                    env_id,
                    app_name,
                    env_name,
                    pipeline_id,
                    workflow_id,
                    base_workflow_id,
                    resolve_variables,
                },
            )
            .await
        }
        Command::Logs { query } => run_logs(&options, client, query, shutdown_signal).await,
        Command::Abort {
            pipeline_id,
            workflow_id,
        } => {
            client.abort_workflow(pipeline_id, workflow_id).await?;
            println!("Abort requested for workflow {}", workflow_id);
            Ok(())
        }
        Command::Sync { app_id, env_id } => {
            client.trigger_manual_sync(app_id, env_id).await?;
            println!("Manual sync triggered for app {} env {}", app_id, env_id);
            Ok(())
        }
        Command::Bulk { operations } => {
            run_bulk(&options, client, operations, shutdown_signal).await
        }
    }
}

async fn run_status(
    options: &AppOptions,
    client: Arc<HttpClient>,
    target: WatchTarget,
    watch: bool,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeckError> {
    if !watch {
        let timeline = client.fetch_timeline(&target.query).await?;
        let breakdown = reduce(&timeline, target.app_type, target.is_virtual_environment);
        println!("Deployment status: {}", render_status(timeline.status.as_str()));
        print_breakdown(&breakdown);
        return Ok(());
    }

    let watcher = StatusWatcher::spawn(options.status_poller.clone(), client, target);
    let mut models = watcher.subscribe();
    tokio::pin!(shutdown_signal);

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Shutdown signal received, shutting down...");
                break;
            }
            changed = models.changed() => {
                // The channel closes when the poller finishes
                if changed.is_err() {
                    break;
                }
                let model = models.borrow_and_update().clone();
                if let Some(model) = model {
                    print_model(&model);
                    if model.status().is_terminal() {
                        break;
                    }
                }
            }
        }
    }

    watcher.stop().await;
    Ok(())
}

async fn run_history(client: Arc<HttpClient>, query: &HistoryQuery) -> Result<(), DeckError> {
    let records = client.fetch_history(query).await?;
    if records.is_empty() {
        println!("No deployments found");
        return Ok(());
    }

    for record in &records {
        println!("{}", render_history_record(record));
    }
    Ok(())
}

struct DiffRequest {
    app_id: i64,
    env_id: i64,
    app_name: String,
    env_name: String,
    pipeline_id: i64,
    workflow_id: i64,
    base_workflow_id: Option<i64>,
    resolve_variables: bool,
}

async fn run_diff(
    options: &AppOptions,
    client: Arc<HttpClient>,
    request: DiffRequest,
) -> Result<(), DeckError> {
    let base_workflow_id = match request.base_workflow_id {
        Some(id) => Some(id),
        None => {
            let history = client
                .fetch_history(&HistoryQuery {
                    app_id: request.app_id,
                    env_id: request.env_id,
                    pipeline_id: request.pipeline_id,
                    offset: 0,
                    size: options.history_page_size,
                })
                .await?;
            preceding(&history, request.workflow_id).map(|r| r.workflow_id)
        }
    };

    let current = client
        .fetch_config_snapshot(&ConfigQuery {
            app_name: request.app_name.clone(),
            env_name: request.env_name.clone(),
            pipeline_id: request.pipeline_id,
            workflow_id: request.workflow_id,
        })
        .await?
        .ok_or_else(|| {
            DeckError::NotFound(format!(
                "no config snapshot for workflow {}",
                request.workflow_id
            ))
        })?;

    let previous = match base_workflow_id {
        Some(base_id) => {
            client
                .fetch_config_snapshot(&ConfigQuery {
                    app_name: request.app_name,
                    env_name: request.env_name,
                    pipeline_id: request.pipeline_id,
                    workflow_id: base_id,
                })
                .await?
        }
        None => None,
    };
    if previous.is_none() {
        println!(
            "{}",
            "No previous deployment to compare against; everything is new".dimmed()
        );
    }

    let items = classify(
        &current,
        previous.as_ref(),
        &DiffCompareOptions {
            resolve_variables: request.resolve_variables,
        },
    );

    for group in group_items(items) {
        println!("{}", group.header.bold());
        for item in &group.items {
            println!("  {} {}", render_diff_state(item.diff_state), item.title);
        }
    }
    Ok(())
}

async fn run_logs(
    options: &AppOptions,
    client: Arc<HttpClient>,
    query: LogQuery,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeckError> {
    let mut stream = log_stream::stream_logs(client, query, options.log_stream.clone());
    tokio::pin!(shutdown_signal);

    let mut result = Ok(());
    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Shutdown signal received, shutting down...");
                break;
            }
            event = stream.next_event() => match event {
                Some(LogStreamEvent::Started) => {
                    println!("{}", "--- logs started ---".dimmed());
                }
                Some(LogStreamEvent::Line(line)) => println!("{}", line),
                Some(LogStreamEvent::Reconnecting { attempt }) => {
                    println!(
                        "{}",
                        format!("--- connection lost, reconnecting (attempt {}) ---", attempt)
                            .yellow()
                    );
                }
                Some(LogStreamEvent::Ended) => {
                    println!("{}", "--- logs complete ---".dimmed());
                    break;
                }
                Some(LogStreamEvent::Unavailable) => {
                    println!("{}", "Logs not available".red());
                    result = Err(DeckError::StreamError("logs not available".to_string()));
                    break;
                }
                None => break,
            }
        }
    }

    stream.stop().await;
    result
}

struct ManualSyncRunner {
    client: Arc<HttpClient>,
}

#[async_trait]
impl OperationRunner for ManualSyncRunner {
    async fn run(&self, operation: &BulkOperation) -> Result<String, DeckError> {
        let app_id = operation
            .payload
            .get("appId")
            .and_then(|v| v.as_i64())
            .ok_or(DeckError::MissingField("appId"))?;
        let env_id = operation
            .payload
            .get("envId")
            .and_then(|v| v.as_i64())
            .ok_or(DeckError::MissingField("envId"))?;

        self.client.trigger_manual_sync(app_id, env_id).await?;
        Ok(format!("sync triggered for app {} env {}", app_id, env_id))
    }
}

async fn run_bulk(
    options: &AppOptions,
    client: Arc<HttpClient>,
    operations: Vec<BulkOperation>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeckError> {
    let store = OperationResultStore::new(operations)?;
    let runner = ManualSyncRunner { client };
    let (abort_handle, abort_signal) = abort_channel();

    let abort_task = tokio::spawn(async move {
        shutdown_signal.await;
        info!("Shutdown signal received, aborting remaining operations...");
        abort_handle.abort();
    });

    let counts = executor::execute(&store, &runner, abort_signal, &options.bulk).await;
    abort_task.abort();

    for record in store.records() {
        let state = match record.state {
            OperationState::Completed => record.state.as_str().green(),
            OperationState::Failed => record.state.as_str().red(),
            OperationState::Aborted => record.state.as_str().yellow(),
            _ => record.state.as_str().dimmed(),
        };
        match &record.message {
            Some(message) => println!("{} {}: {}", state, record.operation.name, message),
            None => println!("{} {}", state, record.operation.name),
        }
    }

    println!();
    println!(
        "{} completed, {} failed, {} aborted ({} total)",
        counts.completed,
        counts.failed,
        counts.aborted,
        counts.total()
    );
    if counts.failed > 0 && !store.retry_operations().is_empty() {
        println!("{}", "Run the command again with the failed targets to retry".dimmed());
    }
    Ok(())
}

fn print_model(model: &StatusModel) {
    println!();
    println!(
        "Deployment status: {} (workflow {}, fetched {})",
        render_status(model.status().as_str()),
        model.timeline.workflow_id,
        model.fetched_at.format("%H:%M:%S"),
    );
    print_breakdown(&model.breakdown);
}

fn print_breakdown(breakdown: &DeploymentStatusBreakdown) {
    for row in breakdown.rows() {
        println!("{}", render_row(row));
        if !row.is_collapsed {
            for detail in row.resource_details.iter().chain(row.kube_list.iter()) {
                println!("      {} {}/{}: {}", "-".dimmed(), detail.kind, detail.name, detail.status);
            }
        }
    }
}

fn render_row(row: &StageRow) -> String {
    let icon = match row.icon {
        IconState::Success => "[ok]".green(),
        IconState::Failed => "[!!]".red(),
        IconState::InProgress => "[..]".yellow(),
        IconState::Waiting => "[  ]".dimmed(),
    };

    let mut line = format!("  {} {}", icon, row.display_text);
    if !row.display_sub_text.is_empty() {
        line.push_str(&format!(" ({})", row.display_sub_text));
    }
    if let Some(time) = row.time {
        line.push_str(&format!(" at {}", time.format("%H:%M:%S")));
    }
    line
}

fn render_status(status: &str) -> String {
    match status {
        "succeeded" | "healthy" => status.green().to_string(),
        "failed" | "error" | "degraded" | "timedout" => status.red().to_string(),
        "cancelled" | "aborted" => status.yellow().to_string(),
        _ => status.to_string(),
    }
}

fn render_diff_state(state: DiffState) -> String {
    match state {
        DiffState::NoDiff => "unchanged".dimmed().to_string(),
        DiffState::HasDiff => "modified ".yellow().to_string(),
        DiffState::Added => "added    ".green().to_string(),
        DiffState::Deleted => "deleted  ".red().to_string(),
    }
}

fn render_history_record(record: &DeploymentHistoryRecord) -> String {
    let when = record
        .started_on
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown time".to_string());
    let mut line = format!(
        "{:>8}  {}  {}",
        record.workflow_id,
        render_status(record.status.as_str()),
        when
    );
    if !record.artifact.is_empty() {
        line.push_str(&format!("  {}", record.artifact));
    }
    if !record.triggered_by_email.is_empty() {
        line.push_str(&format!("  by {}", record.triggered_by_email));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_status_command_requires_identifiers() {
        let err = Command::from_args(&args(&[("command", "status")])).unwrap_err();
        assert!(matches!(err, DeckError::MissingField("app")));

        let err =
            Command::from_args(&args(&[("command", "status"), ("app", "12")])).unwrap_err();
        assert!(matches!(err, DeckError::MissingField("env")));
    }

    #[test]
    fn test_status_command_parses_target() {
        let command = Command::from_args(&args(&[
            ("command", "status"),
            ("app", "12"),
            ("env", "3"),
            ("app-type", "helm"),
            ("virtual-env", "true"),
            ("watch", "true"),
        ]))
        .unwrap();

        match command {
            Command::Status { target, watch } => {
                assert_eq!(target.query.app_id, 12);
                assert_eq!(target.query.env_id, 3);
                assert_eq!(target.query.trigger_id, None);
                assert_eq!(target.app_type, DeploymentAppType::Helm);
                assert!(target.is_virtual_environment);
                assert!(watch);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_integer_is_a_config_error() {
        let err = Command::from_args(&args(&[
            ("command", "status"),
            ("app", "twelve"),
            ("env", "3"),
        ]))
        .unwrap_err();
        assert!(matches!(err, DeckError::ConfigError(_)));
    }

    #[test]
    fn test_bulk_targets_parse() {
        let operations = parse_bulk_targets("12:3, 12:4,15:3").unwrap();
        assert_eq!(operations.len(), 3);
        assert_eq!(operations[0].id, "12:3");
        assert_eq!(operations[2].id, "15:3");
        assert_eq!(operations[1].payload["envId"], 4);

        assert!(parse_bulk_targets("12").is_err());
        assert!(parse_bulk_targets("").is_err());
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let err = Command::from_args(&args(&[("command", "deploy")])).unwrap_err();
        assert!(matches!(err, DeckError::ConfigError(_)));
    }
}
