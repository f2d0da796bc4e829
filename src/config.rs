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

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::{Context, Result};
use gethostname::gethostname;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::layout::{DEFAULT_LOG_FILE, DEFAULT_ROOT_DIR};
use crate::storage::{ReadPolicy, StorageLayout};

/// Directory name used under the platform config and data directories.
const APP_DIR: &str = "bt-messenger";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "BT_MESSENGER_DATA_DIR";

/// Get a sanitized hostname suitable as a Bluetooth device name.
/// Bluetooth names should only contain alphanumeric chars, spaces, and hyphens.
fn get_sanitized_hostname() -> String {
    let hostname = gethostname().to_string_lossy().to_string();
    let sanitized: String = hostname
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == ' ' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() {
        "Desktop".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for the message store.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Local device settings.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Default conversation settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device name used as the local participant.
    /// Computed from the system hostname when unset.
    pub name: Option<String>,
}

impl DeviceConfig {
    pub fn device_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => get_sanitized_hostname(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Remote participant of the default conversation.
    pub peer: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            peer: "user2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per conversation.
    pub root_dir_name: String,

    /// Log file name inside each conversation directory.
    pub log_file_name: String,

    /// How malformed log lines are handled: "skip" or "abort".
    pub read_policy: ReadPolicy,

    /// Capacity of the storage worker request queue.
    pub worker_queue: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir_name: DEFAULT_ROOT_DIR.to_string(),
            log_file_name: DEFAULT_LOG_FILE.to_string(),
            read_policy: ReadPolicy::default(),
            worker_queue: 32,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            device: DeviceConfig::default(),
            conversation: ConversationConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn default_data_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR),
    }
}

impl Config {
    /// Load configuration from file or create default.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path(), default_data_dir())
    }

    /// Load configuration from a specific file, writing defaults if absent.
    pub fn load_from(config_path: &Path, data_dir: PathBuf) -> Result<Self> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {:?}", config_path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {:?}", config_path))?
        } else {
            let config = Self::default();
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(config_path, content)?;
            config
        };

        config.data_dir = data_dir;
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create {:?}", config.data_dir))?;

        Ok(config)
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Storage layout under the configured data directory.
    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.data_dir)
            .with_names(&self.storage.root_dir_name, &self.storage.log_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_writes_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config").join("config.toml");
        let data_dir = dir.path().join("data");

        let config = Config::load_from(&config_path, data_dir.clone())?;
        assert!(config_path.exists());
        assert!(data_dir.is_dir());
        assert_eq!(config.conversation.peer, "user2");
        assert_eq!(config.storage.root_dir_name, "conversations_storage");
        assert_eq!(config.storage.read_policy, ReadPolicy::Skip);

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[device]\nname = \"Pixel 7\"\n\n[storage]\nread_policy = \"abort\"\n",
        )?;

        let config = Config::load_from(&config_path, dir.path().join("data"))?;
        assert_eq!(config.device.device_name(), "Pixel 7");
        assert_eq!(config.storage.read_policy, ReadPolicy::Abort);
        assert_eq!(config.storage.log_file_name, "messages.txt");
        assert_eq!(config.storage.worker_queue, 32);

        Ok(())
    }

    #[test]
    fn test_save_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");

        let mut config = Config::load_from(&config_path, dir.path().join("data"))?;
        config.conversation.peer = "bob".to_string();
        config.save_to(&config_path)?;

        let reloaded = Config::load_from(&config_path, dir.path().join("data"))?;
        assert_eq!(reloaded.conversation.peer, "bob");

        Ok(())
    }

    #[test]
    fn test_blank_device_name_falls_back_to_hostname() {
        let device = DeviceConfig {
            name: Some("  ".to_string()),
        };
        assert!(!device.device_name().is_empty());
    }

    #[test]
    fn test_layout_uses_configured_names() {
        let mut config = Config::default();
        config.data_dir = PathBuf::from("/data");
        config.storage.root_dir_name = "chats".to_string();

        assert_eq!(
            config.layout().log_path("a_b"),
            PathBuf::from("/data/chats/a_b/messages.txt")
        );
    }
}
