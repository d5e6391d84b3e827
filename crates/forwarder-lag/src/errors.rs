// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for lag estimation.

use std::io;
use std::path::PathBuf;

/// Reasons a single poll can fail to resolve a timestamp.
///
/// None of these are fatal to the process: the poll is skipped and the next
/// one starts from scratch.
#[derive(Debug, thiserror::Error)]
pub enum LagError {
    /// The checkpoint file itself is missing or unreadable.
    #[error("checkpoint file {} is unreadable: {source}", .path.display())]
    CheckpointUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The checkpoint was read but does not hold a valid position record.
    #[error("malformed checkpoint: {0}")]
    MalformedCheckpoint(String),

    /// The log file named by the checkpoint cannot be inspected or opened.
    #[error("log file {} is unavailable: {reason}", .path.display())]
    FileUnavailable { path: PathBuf, reason: String },

    #[error("failed to seek to byte {offset}: {reason}")]
    SeekFailure { offset: u64, reason: String },

    #[error("failed to read line at byte {offset}: {source}")]
    ReadFailure {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The line is too short to carry a timestamp prefix.
    #[error("no timestamp found: line is {len} bytes, at least {min} are required")]
    NoTimestampFound { len: usize, min: usize },

    /// The line is long enough but no accepted layout matches its prefix.
    #[error("unparseable timestamp at start of line {prefix:?}")]
    UnparseableTimestamp { prefix: String },
}
