// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Resolves a forwarder checkpoint to the timestamp of the last shipped line.
//!
//! Each call to [`LagEstimator::resolve`] is an independent poll:
//!
//! ```text
//!   read checkpoint ──> parse ──> rotated? ──yes──> (file ctime, RotationDetected)
//!                                    │
//!                                    no
//!                                    v
//!                       read line at offset + 1 ──eof──> (now, EndOfFileCaughtUp)
//!                                    │
//!                                    v
//!                          parse leading timestamp ──> (ts, ParsedFromContent)
//! ```
//!
//! The checkpoint offset names the last byte of the line the forwarder most
//! recently consumed (its trailing newline), so reading resumes one byte later.

use crate::clock::{Clock, SystemClock};
use crate::errors::LagError;
use crate::line_reader::read_line_at;
use crate::position::PositionRecord;
use crate::rotation::{detect_rotation, FileInspector, Rotation, StatInspector};
use crate::timestamp::TimestampExtractor;
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which branch of the poll produced a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    RotationDetected,
    EndOfFileCaughtUp,
    ParsedFromContent,
}

impl Provenance {
    /// Short identifier suitable for a metric tag value.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Provenance::RotationDetected => "rotation_detected",
            Provenance::EndOfFileCaughtUp => "eof_caught_up",
            Provenance::ParsedFromContent => "parsed_from_content",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Provenance::RotationDetected => "file rotate detected",
            Provenance::EndOfFileCaughtUp => "byte offset points to eof",
            Provenance::ParsedFromContent => "parsed from log line",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub timestamp: DateTime<Utc>,
    pub provenance: Provenance,
}

impl ResolvedTimestamp {
    /// Whole seconds between the resolved timestamp and `now`.
    ///
    /// Negative when the log line is stamped ahead of the local clock.
    pub fn delay_secs(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp() - self.timestamp.timestamp()
    }
}

/// Turns one forwarder checkpoint file into a [`ResolvedTimestamp`].
///
/// Holds no state between polls beyond its configuration and collaborators.
#[derive(Debug)]
pub struct LagEstimator<I = StatInspector, C = SystemClock> {
    checkpoint_path: PathBuf,
    inspector: I,
    clock: C,
    extractor: TimestampExtractor,
}

impl LagEstimator {
    /// An estimator using `stat(2)` and the system clock.
    pub fn new(checkpoint_path: impl Into<PathBuf>) -> Self {
        Self::with_collaborators(checkpoint_path, StatInspector, SystemClock)
    }
}

impl<I: FileInspector, C: Clock> LagEstimator<I, C> {
    pub fn with_collaborators(checkpoint_path: impl Into<PathBuf>, inspector: I, clock: C) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            inspector,
            clock,
            extractor: TimestampExtractor::default(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: TimestampExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Runs one poll against the checkpoint file.
    pub fn resolve(&self) -> Result<ResolvedTimestamp, LagError> {
        let data =
            fs::read(&self.checkpoint_path).map_err(|source| LagError::CheckpointUnreadable {
                path: self.checkpoint_path.clone(),
                source,
            })?;
        let record = PositionRecord::parse(&data)?;
        debug!(
            "Checkpoint {}: file={} offset={} inode={}",
            self.checkpoint_path.display(),
            record.log_file.display(),
            record.offset,
            record.inode
        );

        if let Rotation::Rotated { created } = detect_rotation(&self.inspector, &record)? {
            return Ok(ResolvedTimestamp {
                timestamp: created,
                provenance: Provenance::RotationDetected,
            });
        }

        let file = File::open(&record.log_file).map_err(|e| LagError::FileUnavailable {
            path: record.log_file.clone(),
            reason: e.to_string(),
        })?;
        let start = record
            .offset
            .checked_add(1)
            .ok_or_else(|| LagError::SeekFailure {
                offset: record.offset,
                reason: "offset overflows when advanced past the checkpoint".to_string(),
            })?;

        let line = read_line_at(file, start)?;
        if line.is_end_of_data() {
            return Ok(ResolvedTimestamp {
                timestamp: self.clock.now(),
                provenance: Provenance::EndOfFileCaughtUp,
            });
        }

        let timestamp = self.extractor.extract(&line.text, self.clock.now())?;
        Ok(ResolvedTimestamp {
            timestamp,
            provenance: Provenance::ParsedFromContent,
        })
    }
}
