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

//! Message record definition and line encoding.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::conversation::{derive_conversation_id, Participants};
use super::error::{Result, StoreError};

/// Timestamp layout stored in every record (`yyyy-MM-dd HH:mm:ss`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a local timestamp the way records store it.
pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// A single stored message.
///
/// Field order matches the on-disk layout of a log line. The fields are
/// public for reading; [`MessageLog::append`](super::log::MessageLog::append)
/// checks a record with [`MessageRecord::validate`] before writing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub conversation_id: String,
    pub participants: Vec<String>,
    pub sender: String,
    pub timestamp: String,
    pub message: String,
}

impl MessageRecord {
    /// Create a record stamped with the local clock.
    pub fn new(participants: &Participants, sender: &str, message: &str) -> Result<Self> {
        Self::at(participants, sender, message, Local::now().naive_local())
    }

    /// Create a record with an explicit creation time.
    pub fn at(
        participants: &Participants,
        sender: &str,
        message: &str,
        time: NaiveDateTime,
    ) -> Result<Self> {
        if message.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }
        if !participants.contains(sender) {
            return Err(StoreError::SenderNotParticipant(sender.to_string()));
        }

        Ok(Self {
            conversation_id: participants.conversation_id(),
            participants: participants.as_slice().to_vec(),
            sender: sender.to_string(),
            timestamp: format_timestamp(&time),
            message: message.to_string(),
        })
    }

    /// Check that the record is consistent with its participants.
    pub fn validate(&self) -> Result<()> {
        let expected = derive_conversation_id(&self.participants)?;
        if expected != self.conversation_id {
            return Err(StoreError::ConversationMismatch {
                expected,
                found: self.conversation_id.clone(),
            });
        }
        if !self.participants.contains(&self.sender) {
            return Err(StoreError::SenderNotParticipant(self.sender.clone()));
        }
        if self.message.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }
        Ok(())
    }

    /// Encode as one log line, including the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self).map_err(StoreError::Serialize)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one log line. `line_no` is 1-based and only used for errors.
    pub fn from_line(line: &[u8], line_no: usize) -> Result<Self> {
        serde_json::from_slice(line).map_err(|source| StoreError::Parse {
            line: line_no,
            source,
        })
    }

    /// Indented JSON for display.
    pub fn to_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(StoreError::Serialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_record_fields() {
        let participants = Participants::new(["carol", "bob"]).unwrap();
        let record = MessageRecord::at(&participants, "carol", "hi", noon()).unwrap();

        assert_eq!(record.conversation_id, "bob_carol");
        assert_eq!(record.participants, vec!["carol", "bob"]);
        assert_eq!(record.sender, "carol");
        assert_eq!(record.timestamp, "2024-01-01 10:00:00");
        assert_eq!(record.message, "hi");
    }

    #[test]
    fn test_line_layout() {
        let participants = Participants::new(["bob", "carol"]).unwrap();
        let record = MessageRecord::at(&participants, "bob", "hi", noon()).unwrap();

        assert_eq!(
            record.to_line().unwrap(),
            "{\"conversation_id\":\"bob_carol\",\"participants\":[\"bob\",\"carol\"],\
             \"sender\":\"bob\",\"timestamp\":\"2024-01-01 10:00:00\",\"message\":\"hi\"}\n"
        );
    }

    #[test]
    fn test_escapes_survive_a_line() {
        let participants = Participants::new(["bob", "carol"]).unwrap();
        let text = "she said \"hi\"\\n\nsecond line\ttab \u{1F600}";
        let record = MessageRecord::at(&participants, "bob", text, noon()).unwrap();

        let line = record.to_line().unwrap();
        // Exactly one terminator, at the end
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));

        let decoded = MessageRecord::from_line(line.trim_end().as_bytes(), 1).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_rejects_empty_message() {
        let participants = Participants::new(["bob", "carol"]).unwrap();
        assert!(matches!(
            MessageRecord::at(&participants, "bob", "   ", noon()),
            Err(StoreError::EmptyMessage)
        ));
    }

    #[test]
    fn test_rejects_foreign_sender() {
        let participants = Participants::new(["bob", "carol"]).unwrap();
        assert!(matches!(
            MessageRecord::at(&participants, "mallory", "hi", noon()),
            Err(StoreError::SenderNotParticipant(_))
        ));
    }

    #[test]
    fn test_validate_catches_edited_fields() {
        let participants = Participants::new(["bob", "carol"]).unwrap();
        let record = MessageRecord::at(&participants, "bob", "hi", noon()).unwrap();
        assert!(record.validate().is_ok());

        let mut wrong_id = record.clone();
        wrong_id.conversation_id = "carol_bob".to_string();
        assert!(matches!(
            wrong_id.validate(),
            Err(StoreError::ConversationMismatch { expected, .. }) if expected == "bob_carol"
        ));

        let mut wrong_sender = record.clone();
        wrong_sender.sender = "mallory".to_string();
        assert!(matches!(
            wrong_sender.validate(),
            Err(StoreError::SenderNotParticipant(_))
        ));

        let mut blank = record;
        blank.message = " ".to_string();
        assert!(matches!(blank.validate(), Err(StoreError::EmptyMessage)));
    }

    #[test]
    fn test_parse_error_carries_line_number() {
        let err = MessageRecord::from_line(b"not-json", 7).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 7, .. }));
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let err = MessageRecord::from_line(br#"{"conversation_id":"a_b"}"#, 1).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 1, .. }));
    }
}
