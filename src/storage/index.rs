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

//! Conversation index stored in `conversations.json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::conversation::Participants;
use super::error::{Result, StoreError};

/// Index entry for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub participants: Vec<String>,
    /// Timestamp of the first message, in record timestamp format.
    pub created_at: String,
}

/// Known conversations, keyed by conversation id.
pub struct ConversationIndex {
    path: PathBuf,
    conversations: BTreeMap<String, ConversationEntry>,
}

impl ConversationIndex {
    /// Open the index. A missing or blank file is an empty index.
    pub fn open(path: &Path) -> Result<Self> {
        let conversations = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| StoreError::Index {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            conversations,
        })
    }

    /// Add a conversation if it is not indexed yet.
    ///
    /// Returns `true` when a new entry was written.
    pub fn register(&mut self, participants: &Participants, created_at: &str) -> Result<bool> {
        let id = participants.conversation_id();
        if self.conversations.contains_key(&id) {
            return Ok(false);
        }

        self.conversations.insert(
            id.clone(),
            ConversationEntry {
                participants: participants.as_slice().to_vec(),
                created_at: created_at.to_string(),
            },
        );
        self.save()?;
        info!("Registered conversation {}", id);
        Ok(true)
    }

    pub fn get(&self, conversation_id: &str) -> Option<&ConversationEntry> {
        self.conversations.get(conversation_id)
    }

    /// Conversation ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.conversations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Save to disk.
    ///
    /// Writes a sibling temp file and renames it over the index, so a crash
    /// mid-save leaves the previous index intact.
    fn save(&self) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.conversations).map_err(StoreError::Serialize)?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
