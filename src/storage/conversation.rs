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

//! Conversation identity.
//!
//! A conversation is keyed by its participants: the identifiers are sorted
//! in byte order and joined with `_`, so every participant derives the
//! same key no matter who started the conversation.

use std::collections::HashSet;

use super::error::{Result, StoreError};

/// Separator placed between sorted participant identifiers.
pub const ID_SEPARATOR: &str = "_";

/// Validated participants of a conversation, kept in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participants(Vec<String>);

impl Participants {
    /// Validate a participant list.
    ///
    /// Requires at least two distinct, non-blank identifiers. Identifiers
    /// containing path separators are rejected because the conversation id
    /// names a directory on disk.
    pub fn new<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        validate(&ids)?;
        Ok(Self(ids))
    }

    /// The stable conversation id for this participant set.
    pub fn conversation_id(&self) -> String {
        join_sorted(&self.0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|p| p == id)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Derive the conversation id for a set of participant identifiers.
pub fn derive_conversation_id<S: AsRef<str>>(participants: &[S]) -> Result<String> {
    validate(participants)?;
    Ok(join_sorted(participants))
}

fn join_sorted<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.join(ID_SEPARATOR)
}

fn validate<S: AsRef<str>>(ids: &[S]) -> Result<()> {
    if ids.len() < 2 {
        return Err(StoreError::TooFewParticipants(ids.len()));
    }

    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        let id = id.as_ref();
        if id.trim().is_empty() {
            return Err(StoreError::EmptyParticipant);
        }
        if id.contains(['/', '\\', '\0']) {
            return Err(StoreError::InvalidParticipant(id.to_string()));
        }
        if !seen.insert(id) {
            return Err(StoreError::DuplicateParticipant(id.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_join() {
        assert_eq!(derive_conversation_id(&["alice", "bob"]).unwrap(), "alice_bob");
        assert_eq!(derive_conversation_id(&["carol", "bob"]).unwrap(), "bob_carol");
    }

    #[test]
    fn test_order_independent() {
        let pairs = [("Pixel 7", "user2"), ("zed", "Alpha"), ("b", "a")];
        for (a, b) in pairs {
            assert_eq!(
                derive_conversation_id(&[a, b]).unwrap(),
                derive_conversation_id(&[b, a]).unwrap()
            );
        }
    }

    #[test]
    fn test_byte_order_puts_uppercase_first() {
        // Byte order, not locale order
        assert_eq!(derive_conversation_id(&["bob", "Zoe"]).unwrap(), "Zoe_bob");
    }

    #[test]
    fn test_three_participants() {
        let id = derive_conversation_id(&["dave", "alice", "carol"]).unwrap();
        assert_eq!(id, "alice_carol_dave");
    }

    #[test]
    fn test_stable_across_calls() {
        let participants = Participants::new(["user2", "Galaxy S21"]).unwrap();
        assert_eq!(participants.conversation_id(), participants.conversation_id());
        assert_eq!(participants.conversation_id(), "Galaxy S21_user2");
    }

    #[test]
    fn test_participants_keep_given_order() {
        let participants = Participants::new(["user2", "alice"]).unwrap();
        assert_eq!(participants.as_slice(), ["user2", "alice"]);
        assert!(participants.contains("alice"));
        assert!(!participants.contains("bob"));
    }

    #[test]
    fn test_rejects_single_participant() {
        assert!(matches!(
            derive_conversation_id(&["alice"]),
            Err(StoreError::TooFewParticipants(1))
        ));
    }

    #[test]
    fn test_rejects_duplicates() {
        assert!(matches!(
            derive_conversation_id(&["alice", "alice"]),
            Err(StoreError::DuplicateParticipant(id)) if id == "alice"
        ));
    }

    #[test]
    fn test_rejects_blank_and_path_like_ids() {
        assert!(matches!(
            derive_conversation_id(&["alice", "  "]),
            Err(StoreError::EmptyParticipant)
        ));
        assert!(matches!(
            derive_conversation_id(&["alice", "../bob"]),
            Err(StoreError::InvalidParticipant(_))
        ));
    }
}
