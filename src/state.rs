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

//! Application state management.
//!
//! Holds the local device identity and the status feed that a presentation
//! layer polls or subscribes to.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Number of statuses kept for polling.
const STATUS_HISTORY: usize = 100;

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Info => "info",
            StatusLevel::Error => "error",
        }
    }
}

/// One displayable outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Local device identifier, `None` while the adapter is unavailable.
    device_name: RwLock<Option<String>>,

    /// Most recent statuses, oldest first.
    statuses: RwLock<VecDeque<Status>>,

    status_tx: broadcast::Sender<Status>,
}

impl Default for AppState {
    fn default() -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_HISTORY);
        Self {
            device_name: RwLock::new(None),
            statuses: RwLock::new(VecDeque::with_capacity(STATUS_HISTORY)),
            status_tx,
        }
    }
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_device_name(&self, device_name: String) {
        *self.device_name.write() = Some(device_name);
    }

    pub fn clear_device_name(&self) {
        *self.device_name.write() = None;
    }

    pub fn get_device_name(&self) -> Option<String> {
        self.device_name.read().clone()
    }

    /// Record a status and notify subscribers.
    pub fn publish(&self, status: Status) {
        {
            let mut statuses = self.statuses.write();
            if statuses.len() == STATUS_HISTORY {
                statuses.pop_front();
            }
            statuses.push_back(status.clone());
        }
        // No subscribers is fine; the history still has it.
        let _ = self.status_tx.send(status);
    }

    /// Receive statuses published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Status> {
        self.status_tx.subscribe()
    }

    pub fn recent_statuses(&self) -> Vec<Status> {
        self.statuses.read().iter().cloned().collect()
    }

    pub fn last_status(&self) -> Option<Status> {
        self.statuses.read().back().cloned()
    }
}
