// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reads the single line that starts at a byte offset.

use crate::errors::LagError;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

/// The bytes found at an offset, up to and excluding the next newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLookupResult {
    pub text: String,
    /// A terminating `\n` was found and removed from `text`.
    pub truncated_newline_stripped: bool,
    /// The stream ended before a newline was found.
    pub reached_end_of_file: bool,
}

impl LineLookupResult {
    /// True when there is no complete line to parse.
    ///
    /// Either nothing follows the offset, or the writer has not yet flushed the
    /// newline that ends the last line. In both cases the forwarder is caught
    /// up, and `text` must not be parsed.
    pub fn is_end_of_data(&self) -> bool {
        self.reached_end_of_file && !self.truncated_newline_stripped
    }
}

/// Seeks to `start` and reads forward to the next `\n` or end of stream.
///
/// Seeking past the end of a regular file succeeds on POSIX systems and then
/// reads zero bytes, so an offset beyond the file surfaces as end of data
/// rather than a [`LagError::SeekFailure`]. Other platforms may reject the seek.
pub fn read_line_at<R: Read + Seek>(reader: R, start: u64) -> Result<LineLookupResult, LagError> {
    let mut reader = BufReader::new(reader);
    reader
        .seek(SeekFrom::Start(start))
        .map_err(|e| LagError::SeekFailure {
            offset: start,
            reason: e.to_string(),
        })?;

    let mut data = Vec::new();
    reader
        .read_until(b'\n', &mut data)
        .map_err(|source| LagError::ReadFailure {
            offset: start,
            source,
        })?;

    let stripped = data.last() == Some(&b'\n');
    if stripped {
        data.pop();
    }

    Ok(LineLookupResult {
        text: String::from_utf8_lossy(&data).into_owned(),
        truncated_newline_stripped: stripped,
        reached_end_of_file: !stripped,
    })
}
