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

//! Append-only line-delimited JSON message log.
//!
//! Each line of the file is one self-contained [`MessageRecord`]. Appends
//! write a whole line or nothing; reads stream the file line by line and
//! parse every line on its own, so one damaged line never hides the
//! records around it.
//!
//! Read policy: [`ReadPolicy::Skip`] (the default) reports malformed lines
//! by number and keeps reading. [`ReadPolicy::Abort`] stops at the first
//! malformed line and returns its [`StoreError::Parse`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{Result, StoreError};
use super::record::MessageRecord;

/// What to do with a line that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicy {
    /// Record the line number and continue with the next line.
    #[default]
    Skip,
    /// Stop and return the parse error.
    Abort,
}

/// Result of a full log scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadReport {
    /// Records in append order.
    pub records: Vec<MessageRecord>,
    /// 1-based numbers of lines that were skipped as malformed.
    pub skipped_lines: Vec<usize>,
}

/// Handle to one conversation's log file.
///
/// Appends hold the handle's write lock. Clones share it, and handles
/// built by [`StorageLayout`](super::StorageLayout) share the layout's lock,
/// so appends through any of them never interleave.
#[derive(Debug, Clone)]
pub struct MessageLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl MessageLog {
    /// Handle with its own write lock.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_lock(path, Arc::new(Mutex::new(())))
    }

    /// Handle guarded by an existing write lock.
    pub fn with_lock(path: impl Into<PathBuf>, write_lock: Arc<Mutex<()>>) -> Self {
        Self {
            path: path.into(),
            write_lock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line, creating the file if needed.
    ///
    /// The record is validated first. The line is synced to disk before
    /// returning. If the write fails the file is truncated back to its
    /// previous length.
    pub fn append(&self, record: &MessageRecord) -> Result<()> {
        record.validate()?;
        let line = record.to_line()?;
        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        let start = file.metadata()?.len();

        // A previous writer may have died mid-line; never glue onto it.
        let mut bytes = Vec::with_capacity(line.len() + 1);
        if start > 0 && !ends_with_newline(&mut file, start)? {
            warn!("Log {:?} ends without a line terminator, starting a new line", self.path);
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(line.as_bytes());

        if let Err(e) = file.write_all(&bytes).and_then(|_| file.sync_data()) {
            if let Err(truncate_err) = file.set_len(start) {
                warn!("Failed to roll back partial write to {:?}: {}", self.path, truncate_err);
            }
            return Err(e.into());
        }

        debug!(
            "Appended record to {:?} ({} bytes)",
            self.path,
            bytes.len()
        );
        Ok(())
    }

    /// Stream the log one record at a time.
    ///
    /// A log that does not exist yet reads as empty. Each call opens the
    /// file afresh, so iteration can be restarted at any time.
    pub fn records(&self) -> Result<Records> {
        let reader = match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Records {
            reader,
            line_no: 0,
            buf: Vec::new(),
        })
    }

    /// Read the whole log under the given policy.
    pub fn read_all(&self, policy: ReadPolicy) -> Result<ReadReport> {
        let mut report = ReadReport::default();

        for item in self.records()? {
            match item {
                Ok(record) => report.records.push(record),
                Err(StoreError::Parse { line, source }) => match policy {
                    ReadPolicy::Skip => {
                        warn!("Skipping malformed line {} in {:?}: {}", line, self.path, source);
                        report.skipped_lines.push(line);
                    }
                    ReadPolicy::Abort => return Err(StoreError::Parse { line, source }),
                },
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Read {} records from {:?} ({} skipped)",
            report.records.len(),
            self.path,
            report.skipped_lines.len()
        );
        Ok(report)
    }
}

fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Lazy iterator over the records of a log.
///
/// Yields one item per non-blank line. A malformed line yields
/// [`StoreError::Parse`] and iteration continues with the next line; an I/O
/// error ends the iteration.
#[derive(Debug)]
pub struct Records {
    reader: Option<BufReader<File>>,
    line_no: usize,
    buf: Vec<u8>,
}

impl Iterator for Records {
    type Item = Result<MessageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.reader.as_mut()?;
            self.buf.clear();

            match reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.reader = None;
                    return Some(Err(e.into()));
                }
            }

            self.line_no += 1;
            let line = trim_line_end(&self.buf);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Some(MessageRecord::from_line(line, self.line_no));
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
