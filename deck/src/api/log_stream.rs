//! Build/deploy log streaming
//!
//! The orchestrator serves logs as a persistent line-delimited response
//! bracketed by start/end markers. The stream task forwards lines over a
//! channel and reconnects a bounded number of times when the connection
//! drops before the end marker; after that the logs are reported as
//! unavailable instead of retrying forever.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::client::HttpClient;
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// First line of a healthy stream.
pub const START_MARKER: &str = "START_OF_STREAM";

/// Last line of a finished stream; everything after it is ignored.
pub const END_MARKER: &str = "END_OF_STREAM";

/// Route parameters for one workflow's log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub pipeline_id: i64,
    pub workflow_id: i64,
}

/// Log stream options
#[derive(Debug, Clone)]
pub struct LogStreamOptions {
    /// Reconnect attempts after a dropped connection before giving up.
    pub max_reconnects: u32,

    /// Backoff between reconnect attempts.
    pub cooldown: CooldownOptions,

    /// Event channel capacity; the stream task pauses when the consumer
    /// falls this far behind.
    pub channel_capacity: usize,
}

impl Default for LogStreamOptions {
    fn default() -> Self {
        Self {
            max_reconnects: 3,
            cooldown: CooldownOptions::default(),
            channel_capacity: 256,
        }
    }
}

/// What the consumer sees, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStreamEvent {
    /// Start marker received; lines follow.
    Started,

    /// One log line, marker lines excluded.
    Line(String),

    /// End marker received; the stream is complete.
    Ended,

    /// Connection dropped; a reconnect attempt is about to start.
    Reconnecting { attempt: u32 },

    /// Reconnect attempts exhausted; logs are not available.
    Unavailable,
}

/// Consumer handle for a running log stream.
pub struct LogStream {
    events_rx: mpsc::Receiver<LogStreamEvent>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl LogStream {
    /// Next event, `None` once the stream task has finished and drained.
    pub async fn next_event(&mut self) -> Option<LogStreamEvent> {
        self.events_rx.recv().await
    }

    /// Stop the stream and wait for the task to wind down.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Start streaming a workflow's logs in a background task.
pub fn stream_logs(
    client: Arc<HttpClient>,
    query: LogQuery,
    options: LogStreamOptions,
) -> LogStream {
    let (events_tx, events_rx) = mpsc::channel(options.channel_capacity.max(1));
    let (stop_tx, stop_rx) = watch::channel(false);

    let task = tokio::spawn(stream_loop(client, query, options, events_tx, stop_rx));

    LogStream {
        events_rx,
        stop_tx,
        task: Some(task),
    }
}

enum StreamOutcome {
    /// End marker seen.
    Ended,
    /// Connection dropped before the end marker.
    Dropped(String),
    /// Stop was requested.
    Stopped,
    /// Consumer dropped its receiver.
    ConsumerGone,
}

async fn stream_loop(
    client: Arc<HttpClient>,
    query: LogQuery,
    options: LogStreamOptions,
    events_tx: mpsc::Sender<LogStreamEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let path = format!(
        "/pipeline/{}/workflow/{}/logs",
        query.pipeline_id, query.workflow_id
    );
    info!("Log stream starting for workflow {}...", query.workflow_id);

    let mut attempt: u32 = 0;
    loop {
        if attempt > 0 {
            if events_tx
                .send(LogStreamEvent::Reconnecting { attempt })
                .await
                .is_err()
            {
                return;
            }
            let delay = calc_exp_backoff(&options.cooldown, attempt);
            debug!("Reconnecting log stream in {:?} (attempt {})", delay, attempt);
            tokio::select! {
                _ = stop_rx.changed() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let connection = tokio::select! {
            _ = stop_rx.changed() => return,
            result = client.get_stream(&path) => result,
        };

        match connection {
            Ok(response) => match forward_lines(response, &events_tx, &mut stop_rx).await {
                StreamOutcome::Ended => {
                    let _ = events_tx.send(LogStreamEvent::Ended).await;
                    info!("Log stream for workflow {} complete", query.workflow_id);
                    return;
                }
                StreamOutcome::Stopped => {
                    debug!("Log stream for workflow {} stopped", query.workflow_id);
                    return;
                }
                StreamOutcome::ConsumerGone => return,
                StreamOutcome::Dropped(reason) => {
                    warn!("Log stream dropped: {}", reason);
                }
            },
            Err(e) => {
                error!("Failed to open log stream: {}", e);
            }
        }

        attempt += 1;
        if attempt > options.max_reconnects {
            warn!(
                "Log stream for workflow {} gave up after {} reconnect attempts",
                query.workflow_id, options.max_reconnects
            );
            let _ = events_tx.send(LogStreamEvent::Unavailable).await;
            return;
        }
    }
}

async fn forward_lines(
    response: reqwest::Response,
    events_tx: &mpsc::Sender<LogStreamEvent>,
    stop_rx: &mut watch::Receiver<bool>,
) -> StreamOutcome {
    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let chunk = tokio::select! {
            _ = stop_rx.changed() => return StreamOutcome::Stopped,
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                buffer.extend_from_slice(&bytes);
                for line in drain_lines(&mut buffer) {
                    let event = match line.as_str() {
                        START_MARKER => LogStreamEvent::Started,
                        END_MARKER => return StreamOutcome::Ended,
                        _ => LogStreamEvent::Line(line),
                    };
                    if events_tx.send(event).await.is_err() {
                        return StreamOutcome::ConsumerGone;
                    }
                }
            }
            Some(Err(e)) => return StreamOutcome::Dropped(e.to_string()),
            None => return StreamOutcome::Dropped("closed before end marker".to_string()),
        }
    }
}

/// Split complete lines off the front of the buffer, leaving any trailing
/// partial line in place for the next chunk.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let mut line: Vec<u8> = buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        lines.push(String::from_utf8_lossy(&line).into_owned());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_lines_splits_complete_lines() {
        let mut buffer = b"one\ntwo\r\nthr".to_vec();
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(buffer, b"thr".to_vec());

        buffer.extend_from_slice(b"ee\n");
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["three".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_lines_handles_empty_lines() {
        let mut buffer = b"\n\nx\n".to_vec();
        let lines = drain_lines(&mut buffer);
        assert_eq!(
            lines,
            vec![String::new(), String::new(), "x".to_string()]
        );
    }

    #[test]
    fn test_markers_bracket_the_payload() {
        let mut buffer = format!("{}\nhello\n{}\n", START_MARKER, END_MARKER).into_bytes();
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines[0], START_MARKER);
        assert_eq!(lines[1], "hello");
        assert_eq!(lines[2], END_MARKER);
    }
}
