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

//! Conversation-keyed message storage.

pub mod conversation;
pub mod error;
pub mod index;
pub mod layout;
pub mod log;
pub mod record;

pub use conversation::{derive_conversation_id, Participants};
pub use error::{Result, StoreError};
pub use index::{ConversationEntry, ConversationIndex};
pub use layout::{EntryKind, LayoutStatus, StorageLayout};
pub use log::{MessageLog, ReadPolicy, ReadReport, Records};
pub use record::{MessageRecord, TIMESTAMP_FORMAT};
