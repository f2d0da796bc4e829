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

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the message store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Creating, opening, writing or reading a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A log line is not a well-formed message record.
    #[error("Malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    /// A record could not be encoded.
    #[error("Failed to encode record: {0}")]
    Serialize(serde_json::Error),

    /// The conversation index file is not valid JSON.
    #[error("Malformed conversation index {path:?}: {source}")]
    Index {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("A conversation needs at least two participants, got {0}")]
    TooFewParticipants(usize),

    #[error("Participant identifiers must not be blank")]
    EmptyParticipant,

    /// The identifier would not be usable as a directory name.
    #[error("Invalid participant identifier: {0:?}")]
    InvalidParticipant(String),

    #[error("Participant listed more than once: {0}")]
    DuplicateParticipant(String),

    #[error("Message must not be empty")]
    EmptyMessage,

    /// A record's conversation id is not derived from its participants.
    #[error("Conversation id {found:?} does not match participants (expected {expected:?})")]
    ConversationMismatch { expected: String, found: String },

    #[error("Sender {0:?} is not a participant of the conversation")]
    SenderNotParticipant(String),

    /// The background storage worker is no longer running.
    #[error("Storage worker has stopped")]
    WorkerClosed,
}

/// Convenience alias used throughout the storage module.
pub type Result<T> = std::result::Result<T, StoreError>;
