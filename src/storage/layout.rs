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

//! On-disk layout of the message store.
//!
//! ```text
//! <data_dir>/
//!   conversations.json
//!   conversations_storage/
//!     <conversation_id>/
//!       messages.txt
//!       assets/
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::conversation::Participants;
use super::error::Result;
use super::index::ConversationIndex;
use super::log::MessageLog;

pub const DEFAULT_ROOT_DIR: &str = "conversations_storage";
pub const DEFAULT_LOG_FILE: &str = "messages.txt";
pub const ASSETS_DIR: &str = "assets";
pub const CONVERSATIONS_INDEX: &str = "conversations.json";

/// Kind of filesystem entry a layout path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Directory => "directory",
            EntryKind::File => "file",
        }
    }
}

/// Outcome of ensuring one path exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutStatus {
    Created { path: PathBuf, kind: EntryKind },
    AlreadyExists { path: PathBuf, kind: EntryKind },
}

impl LayoutStatus {
    pub fn path(&self) -> &Path {
        match self {
            LayoutStatus::Created { path, .. } | LayoutStatus::AlreadyExists { path, .. } => path,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            LayoutStatus::Created { kind, .. } | LayoutStatus::AlreadyExists { kind, .. } => *kind,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, LayoutStatus::Created { .. })
    }
}

impl fmt::Display for LayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().display().to_string());
        let kind = self.kind().as_str();

        match self {
            LayoutStatus::Created { .. } => write!(f, "Created {} {}", name, kind),
            LayoutStatus::AlreadyExists { .. } => write!(f, "{} {} already exists", name, kind),
        }
    }
}

/// Paths of the message store under a data directory.
///
/// Every log handle and index update made through a layout, or any of its
/// clones, holds the same write lock.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    data_dir: PathBuf,
    root_dir_name: String,
    log_file_name: String,
    write_lock: Arc<Mutex<()>>,
}

impl StorageLayout {
    /// Layout with the default directory and file names.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            root_dir_name: DEFAULT_ROOT_DIR.to_string(),
            log_file_name: DEFAULT_LOG_FILE.to_string(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Override the storage root directory and log file names.
    pub fn with_names(mut self, root_dir_name: &str, log_file_name: &str) -> Self {
        self.root_dir_name = root_dir_name.to_string();
        self.log_file_name = log_file_name.to_string();
        self
    }

    pub fn storage_root(&self) -> PathBuf {
        self.data_dir.join(&self.root_dir_name)
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(CONVERSATIONS_INDEX)
    }

    pub fn conversation_dir(&self, conversation_id: &str) -> PathBuf {
        self.storage_root().join(conversation_id)
    }

    pub fn log_path(&self, conversation_id: &str) -> PathBuf {
        self.conversation_dir(conversation_id).join(&self.log_file_name)
    }

    pub fn assets_dir(&self, conversation_id: &str) -> PathBuf {
        self.conversation_dir(conversation_id).join(ASSETS_DIR)
    }

    /// Log handle for a conversation. The file is created on first append.
    pub fn message_log(&self, conversation_id: &str) -> MessageLog {
        MessageLog::with_lock(self.log_path(conversation_id), self.write_lock.clone())
    }

    /// Add a conversation to the index if it is not there yet.
    pub fn register_conversation(
        &self,
        participants: &Participants,
        created_at: &str,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let mut index = ConversationIndex::open(&self.index_path())?;
        index.register(participants, created_at)
    }

    /// Create the storage root and an empty conversation index.
    pub fn ensure_root(&self) -> Result<Vec<LayoutStatus>> {
        let statuses = vec![
            ensure_dir(&self.storage_root())?,
            ensure_file(&self.index_path(), b"{}")?,
        ];
        log_statuses(&statuses);
        Ok(statuses)
    }

    /// Create a conversation directory with its log file and assets directory.
    pub fn ensure_conversation(&self, conversation_id: &str) -> Result<Vec<LayoutStatus>> {
        let statuses = vec![
            ensure_dir(&self.conversation_dir(conversation_id))?,
            ensure_file(&self.log_path(conversation_id), b"")?,
            ensure_dir(&self.assets_dir(conversation_id))?,
        ];
        log_statuses(&statuses);
        Ok(statuses)
    }
}

fn ensure_dir(path: &Path) -> io::Result<LayoutStatus> {
    let kind = EntryKind::Directory;
    if path.is_dir() {
        return Ok(LayoutStatus::AlreadyExists {
            path: path.to_path_buf(),
            kind,
        });
    }
    fs::create_dir_all(path)?;
    Ok(LayoutStatus::Created {
        path: path.to_path_buf(),
        kind,
    })
}

fn ensure_file(path: &Path, initial: &[u8]) -> io::Result<LayoutStatus> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(initial)?;
            file.sync_all()?;
            Ok(LayoutStatus::Created {
                path: path.to_path_buf(),
                kind: EntryKind::File,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(LayoutStatus::AlreadyExists {
            path: path.to_path_buf(),
            kind: EntryKind::File,
        }),
        Err(e) => Err(e),
    }
}

fn log_statuses(statuses: &[LayoutStatus]) {
    for status in statuses.iter().filter(|s| s.was_created()) {
        info!("Created {:?}", status.path());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths() {
        let layout = StorageLayout::new("/data");
        assert_eq!(
            layout.log_path("alice_bob"),
            PathBuf::from("/data/conversations_storage/alice_bob/messages.txt")
        );
        assert_eq!(
            layout.assets_dir("alice_bob"),
            PathBuf::from("/data/conversations_storage/alice_bob/assets")
        );
        assert_eq!(layout.index_path(), PathBuf::from("/data/conversations.json"));
    }

    #[test]
    fn test_custom_names() {
        let layout = StorageLayout::new("/data").with_names("chats", "log.jsonl");
        assert_eq!(
            layout.log_path("a_b"),
            PathBuf::from("/data/chats/a_b/log.jsonl")
        );
    }

    #[test]
    fn test_ensure_root_creates_then_reports_existing() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());

        let first = layout.ensure_root().unwrap();
        assert!(first.iter().all(LayoutStatus::was_created));
        assert_eq!(std::fs::read_to_string(layout.index_path()).unwrap(), "{}");

        let second = layout.ensure_root().unwrap();
        assert!(second.iter().all(|s| !s.was_created()));
    }

    #[test]
    fn test_ensure_conversation() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());

        let statuses = layout.ensure_conversation("alice_bob").unwrap();
        assert_eq!(statuses.len(), 3);
        assert!(layout.log_path("alice_bob").is_file());
        assert!(layout.assets_dir("alice_bob").is_dir());
        assert_eq!(statuses[1].to_string(), "Created messages.txt file");
    }

    #[test]
    fn test_status_kind_survives_removal() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());

        let statuses = layout.ensure_conversation("alice_bob").unwrap();
        std::fs::remove_dir_all(layout.conversation_dir("alice_bob")).unwrap();

        assert_eq!(statuses[0].kind(), EntryKind::Directory);
        assert_eq!(statuses[0].to_string(), "Created alice_bob directory");
        assert_eq!(statuses[2].to_string(), "Created assets directory");
    }

    #[test]
    fn test_register_conversation_uses_index() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        let participants = Participants::new(["alice", "bob"]).unwrap();

        assert!(layout
            .register_conversation(&participants, "2024-01-01 10:00:00")
            .unwrap());
        assert!(!layout
            .register_conversation(&participants, "2024-01-01 10:00:00")
            .unwrap());

        let index = ConversationIndex::open(&layout.index_path()).unwrap();
        assert!(index.get("alice_bob").is_some());
    }

    #[test]
    fn test_ensure_keeps_existing_log() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure_conversation("alice_bob").unwrap();
        std::fs::write(layout.log_path("alice_bob"), "kept\n").unwrap();

        let statuses = layout.ensure_conversation("alice_bob").unwrap();
        assert_eq!(statuses[1].to_string(), "messages.txt file already exists");
        assert_eq!(
            std::fs::read_to_string(layout.log_path("alice_bob")).unwrap(),
            "kept\n"
        );
    }
}
