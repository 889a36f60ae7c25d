//! Client for the server-sent task stream.
//!
//! One subscription is one HTTP connection. When it ends, for whatever reason, the error
//! handler runs once and nothing reconnects.

use std::sync::mpsc;

use client_logging::{client_debug, client_info, client_warn};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use listing_core::Task;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::{ApiError, EngineEvent, FailureKind};

/// Event name the backend sends once the subscription is registered.
pub const CONNECTED_EVENT: &str = "connected";

/// What a single stream event means to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Connected,
    Task(Task),
    /// Event without payload.
    Empty,
    /// Payload that is not a valid task. Carries the decode error.
    Malformed(String),
}

/// Interprets one event. Any event other than `connected` carries a task.
pub fn decode_event(name: &str, data: &str) -> StreamItem {
    if name == CONNECTED_EVENT {
        return StreamItem::Connected;
    }
    if data.trim().is_empty() {
        return StreamItem::Empty;
    }
    match Task::from_json(data) {
        Ok(task) => StreamItem::Task(task),
        Err(err) => StreamItem::Malformed(err.to_string()),
    }
}

pub trait TaskStreamHandler: Send + 'static {
    fn on_task(&mut self, task: Task);
    fn on_error(&mut self, error: ApiError);
    fn on_connect(&mut self) {}
}

/// Forwards stream callbacks to the engine event channel.
pub struct ChannelStreamHandler {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelStreamHandler {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl TaskStreamHandler for ChannelStreamHandler {
    fn on_task(&mut self, task: Task) {
        let _ = self.tx.send(EngineEvent::TaskPushed(task));
    }

    fn on_error(&mut self, error: ApiError) {
        let _ = self.tx.send(EngineEvent::StreamFailed(error));
    }

    fn on_connect(&mut self) {
        let _ = self.tx.send(EngineEvent::StreamConnected);
    }
}

/// Handle to an open stream. Dropping it unsubscribes.
pub struct Subscription {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stops delivery. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if !self.cancel.is_cancelled() {
            client_debug!("Unsubscribing from task stream");
            self.cancel.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Opens the task stream on `runtime` and delivers its events to `handler`.
pub fn subscribe<H: TaskStreamHandler>(
    runtime: &Handle,
    client: &ApiClient,
    handler: H,
) -> Subscription {
    let cancel = CancellationToken::new();
    let task = runtime.spawn(run_stream(client.clone(), handler, cancel.clone()));
    Subscription { cancel, task }
}

async fn run_stream<H: TaskStreamHandler>(
    client: ApiClient,
    mut handler: H,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => return,
        outcome = pump(&client, &mut handler, &cancel) => outcome,
    };
    if cancel.is_cancelled() {
        return;
    }

    let error = match outcome {
        Ok(()) => ApiError::new(FailureKind::StreamClosed, "task stream ended"),
        Err(err) => err,
    };
    client_warn!("Task stream closed: {error}");
    handler.on_error(error);
}

async fn pump<H: TaskStreamHandler>(
    client: &ApiClient,
    handler: &mut H,
    cancel: &CancellationToken,
) -> Result<(), ApiError> {
    let response = client.open_task_stream().await?;
    let mut events = response.bytes_stream().eventsource();

    while let Some(event) = events.next().await {
        let event = event.map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        if cancel.is_cancelled() {
            return Ok(());
        }
        match decode_event(&event.event, &event.data) {
            StreamItem::Connected => {
                client_info!("Task stream connected");
                handler.on_connect();
            }
            StreamItem::Task(task) => {
                client_debug!("Task {} is {}", task.id, task.status.as_str());
                handler.on_task(task);
            }
            StreamItem::Empty => {}
            StreamItem::Malformed(reason) => {
                client_warn!("Dropping malformed task event '{}': {reason}", event.event);
            }
        }
    }
    Ok(())
}
