// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log rotation detection.
//!
//! A checkpoint's byte offset is only meaningful for the file it was taken
//! from. When the path now names a different inode the file has been rotated
//! and the offset is discarded; the new file's creation time stands in for
//! the forwarder's position instead. That is later than anything the
//! forwarder has actually shipped from the new file, so the reported delay
//! errs on the small side.

use crate::errors::LagError;
use crate::position::PositionRecord;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::debug;

/// What the filesystem currently says about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    pub inode: u64,
    pub created: DateTime<Utc>,
}

/// Looks up the inode and creation time of a path.
pub trait FileInspector {
    fn inspect(&self, path: &Path) -> Result<FileIdentity, LagError>;
}

impl<T: FileInspector + ?Sized> FileInspector for &T {
    fn inspect(&self, path: &Path) -> Result<FileIdentity, LagError> {
        (**self).inspect(path)
    }
}

/// [`FileInspector`] backed by `stat(2)`.
///
/// The status-change time (`st_ctime`) is reported as the creation time, since
/// it is the closest thing to a birth time that every Unix filesystem keeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatInspector;

impl FileInspector for StatInspector {
    #[cfg(unix)]
    #[allow(clippy::unnecessary_cast)]
    #[allow(clippy::cast_sign_loss)]
    #[allow(clippy::cast_possible_truncation)]
    fn inspect(&self, path: &Path) -> Result<FileIdentity, LagError> {
        let stat = nix::sys::stat::stat(path).map_err(|e| LagError::FileUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let created = DateTime::from_timestamp(stat.st_ctime as i64, stat.st_ctime_nsec as u32)
            .ok_or_else(|| LagError::FileUnavailable {
                path: path.to_path_buf(),
                reason: format!("ctime {}s is out of range", stat.st_ctime),
            })?;

        Ok(FileIdentity {
            inode: stat.st_ino as u64,
            created,
        })
    }

    #[cfg(not(unix))]
    fn inspect(&self, path: &Path) -> Result<FileIdentity, LagError> {
        Err(LagError::FileUnavailable {
            path: path.to_path_buf(),
            reason: "inode metadata is unsupported on this platform".to_string(),
        })
    }
}

/// Outcome of comparing a checkpoint against the live file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// The path now names a different file, created at the given instant.
    Rotated { created: DateTime<Utc> },
    Unchanged,
}

pub fn detect_rotation<I: FileInspector>(
    inspector: &I,
    record: &PositionRecord,
) -> Result<Rotation, LagError> {
    let live = inspector.inspect(&record.log_file)?;
    if live.inode == record.inode {
        return Ok(Rotation::Unchanged);
    }

    debug!(
        "Rotation detected for {}: checkpoint inode {:x}, live inode {:x}",
        record.log_file.display(),
        record.inode,
        live.inode
    );
    Ok(Rotation::Rotated {
        created: live.created,
    })
}
