// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Event processing and the background storage worker.
//!
//! The host turns user actions into [`MessengerEvent`]s. A [`StoreWorker`]
//! owns the [`EventProcessor`] and runs every event off the caller's task,
//! so slow storage never blocks whoever asked for the send.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::state::{AppState, Status};
use crate::storage::{
    self, LayoutStatus, MessageRecord, Participants, ReadPolicy, StorageLayout, StoreError,
};

/// Events from the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessengerEvent {
    /// The local adapter reported its name.
    DeviceAvailable { device_name: String },
    /// The local adapter is missing or permission was denied.
    DeviceUnavailable,
    /// Create the storage root and the default conversation.
    InitializeStorage,
    /// The user asked to send a message.
    SendRequested { content: String },
    /// Show a conversation; `None` means the default conversation.
    DisplayRequested { conversation_id: Option<String> },
}

/// A message that reached its conversation log.
#[derive(Debug)]
pub struct SentMessage {
    pub record: MessageRecord,
    /// Set when the record was stored but the conversation index could not
    /// be updated. The log stays the source of truth.
    pub index_error: Option<StoreError>,
}

/// Turns events into store operations and status lines.
pub struct EventProcessor {
    layout: StorageLayout,
    peer: String,
    read_policy: ReadPolicy,
    state: Arc<AppState>,
}

impl EventProcessor {
    /// Create a new event processor.
    pub fn new(
        layout: StorageLayout,
        peer: impl Into<String>,
        read_policy: ReadPolicy,
        state: Arc<AppState>,
    ) -> Self {
        Self {
            layout,
            peer: peer.into(),
            read_policy,
            state,
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Process a single event.
    ///
    /// Every outcome, including failures, comes back as statuses and is
    /// published on the shared state.
    pub fn process_event(&self, event: MessengerEvent) -> Vec<Status> {
        let statuses = match event {
            MessengerEvent::DeviceAvailable { device_name } => {
                info!("Device available: {}", device_name);
                self.state.set_device_name(device_name);
                Vec::new()
            }
            MessengerEvent::DeviceUnavailable => {
                info!("Device unavailable");
                self.state.clear_device_name();
                Vec::new()
            }
            MessengerEvent::InitializeStorage => self.handle_initialize(),
            MessengerEvent::SendRequested { content } => self.handle_send(&content),
            MessengerEvent::DisplayRequested { conversation_id } => {
                self.handle_display(conversation_id.as_deref())
            }
        };

        for status in &statuses {
            self.state.publish(status.clone());
        }
        statuses
    }

    /// Participants of the conversation between this device and the peer.
    pub fn default_participants(&self) -> Option<storage::Result<Participants>> {
        let device_name = self.state.get_device_name()?;
        Some(Participants::new([device_name, self.peer.clone()]))
    }

    /// Store a message from the local device to the configured peer.
    ///
    /// The record is appended before the index is touched, so a damaged
    /// index never loses a message. Returns `Ok(None)` when the local
    /// device is unavailable.
    pub fn send_message(&self, content: &str) -> storage::Result<Option<SentMessage>> {
        let Some(device_name) = self.state.get_device_name() else {
            return Ok(None);
        };
        let participants = Participants::new([device_name.clone(), self.peer.clone()])?;
        let record = MessageRecord::new(&participants, &device_name, content)?;

        self.layout.ensure_conversation(&record.conversation_id)?;
        self.layout
            .message_log(&record.conversation_id)
            .append(&record)?;
        info!("Stored message in conversation {}", record.conversation_id);

        let index_error = match self
            .layout
            .register_conversation(&participants, &record.timestamp)
        {
            Ok(_) => None,
            Err(e) => {
                warn!("Message stored but conversation index not updated: {}", e);
                Some(e)
            }
        };

        Ok(Some(SentMessage {
            record,
            index_error,
        }))
    }

    fn handle_initialize(&self) -> Vec<Status> {
        let mut statuses = Vec::new();

        match self.layout.ensure_root() {
            Ok(created) => statuses.extend(created.iter().map(layout_status)),
            Err(e) => {
                error!("Failed to create storage root: {}", e);
                statuses.push(Status::error(format!("Failed to create storage: {}", e)));
                return statuses;
            }
        }

        let participants = match self.default_participants() {
            Some(Ok(participants)) => participants,
            Some(Err(e)) => {
                statuses.push(Status::error(format!("Invalid conversation: {}", e)));
                return statuses;
            }
            None => {
                debug!("No device name yet, skipping default conversation");
                return statuses;
            }
        };

        match self.layout.ensure_conversation(&participants.conversation_id()) {
            Ok(created) => statuses.extend(created.iter().map(layout_status)),
            Err(e) => {
                error!("Failed to create conversation directory: {}", e);
                statuses.push(Status::error(format!(
                    "Failed to create conversation {}: {}",
                    participants.conversation_id(),
                    e
                )));
            }
        }

        statuses
    }

    fn handle_send(&self, content: &str) -> Vec<Status> {
        let content = content.trim();
        if content.is_empty() {
            return vec![Status::error("Please enter a message!")];
        }

        match self.send_message(content) {
            Ok(Some(SentMessage {
                record,
                index_error,
            })) => {
                let name = file_name(&self.layout.log_path(&record.conversation_id));
                let mut statuses = vec![match record.to_pretty() {
                    Ok(pretty) => Status::info(format!("Message stored in {}:\n{}", name, pretty)),
                    Err(_) => Status::info(format!("Message stored in {}", name)),
                }];
                if let Some(e) = index_error {
                    statuses.push(Status::error(format!(
                        "Failed to update conversation index: {}",
                        e
                    )));
                }
                statuses
            }
            Ok(None) => vec![Status::error("Bluetooth not available or permission denied.")],
            Err(e) => {
                error!("Failed to store message: {}", e);
                vec![Status::error(format!("Failed to store message: {}", e))]
            }
        }
    }

    fn handle_display(&self, conversation_id: Option<&str>) -> Vec<Status> {
        let conversation_id = match conversation_id {
            Some(id) if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) => {
                return vec![Status::error(format!("Invalid conversation id: {:?}", id))];
            }
            Some(id) => id.to_string(),
            None => match self.default_participants() {
                Some(Ok(participants)) => participants.conversation_id(),
                Some(Err(e)) => return vec![Status::error(format!("Invalid conversation: {}", e))],
                None => {
                    return vec![Status::error(
                        "Bluetooth not available or permission denied.",
                    )]
                }
            },
        };

        let log = self.layout.message_log(&conversation_id);
        let name = file_name(log.path());
        if !log.path().exists() {
            return vec![Status::info(format!(
                "{} does not exist in the conversation directory",
                name
            ))];
        }

        let report = match log.read_all(self.read_policy) {
            Ok(report) => report,
            Err(e) => {
                warn!("Failed to read {:?}: {}", log.path(), e);
                return vec![Status::error(format!("Failed to read {}: {}", name, e))];
            }
        };

        let mut statuses = vec![Status::info(format!("Displaying messages from {}:", name))];
        for record in &report.records {
            match record.to_pretty() {
                Ok(pretty) => statuses.push(Status::info(pretty)),
                Err(e) => statuses.push(Status::error(format!("Failed to format record: {}", e))),
            }
        }
        if !report.skipped_lines.is_empty() {
            statuses.push(Status::error(format!(
                "Skipped {} malformed line(s) in {}: {:?}",
                report.skipped_lines.len(),
                name,
                report.skipped_lines
            )));
        }

        statuses
    }
}

fn layout_status(status: &LayoutStatus) -> Status {
    Status::info(status.to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

struct Request {
    event: MessengerEvent,
    reply: oneshot::Sender<Vec<Status>>,
}

/// Background task that owns the processor.
///
/// Requests are handled one at a time, which makes the worker the single
/// writer for every conversation log.
pub struct StoreWorker;

impl StoreWorker {
    /// Start the worker on the current runtime.
    pub fn spawn(processor: EventProcessor, queue: usize) -> (StoreHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let task = tokio::spawn(Self::run(Arc::new(processor), rx));
        (StoreHandle { tx }, task)
    }

    async fn run(processor: Arc<EventProcessor>, mut rx: mpsc::Receiver<Request>) {
        info!("Storage worker started");

        while let Some(Request { event, reply }) = rx.recv().await {
            debug!("Processing {:?}", event);
            let processor = processor.clone();

            match tokio::task::spawn_blocking(move || processor.process_event(event)).await {
                Ok(statuses) => {
                    // The caller may have stopped waiting.
                    let _ = reply.send(statuses);
                }
                Err(e) => {
                    error!("Storage task failed: {}", e);
                    let _ = reply.send(vec![Status::error(format!("Storage task failed: {}", e))]);
                }
            }
        }

        info!("Storage worker stopped");
    }
}

/// Cloneable sender side of a [`StoreWorker`].
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Request>,
}

impl StoreHandle {
    /// Queue an event and wait for its statuses.
    pub async fn submit(&self, event: MessengerEvent) -> storage::Result<Vec<Status>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { event, reply })
            .await
            .map_err(|_| StoreError::WorkerClosed)?;
        rx.await.map_err(|_| StoreError::WorkerClosed)
    }

    pub async fn send_message(&self, content: impl Into<String>) -> storage::Result<Vec<Status>> {
        self.submit(MessengerEvent::SendRequested {
            content: content.into(),
        })
        .await
    }

    pub async fn display(&self, conversation_id: Option<String>) -> storage::Result<Vec<Status>> {
        self.submit(MessengerEvent::DisplayRequested { conversation_id })
            .await
    }
}
