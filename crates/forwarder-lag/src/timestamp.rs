// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Extraction of the leading timestamp from a log line.
//!
//! Lines are expected to start with a fixed-width timestamp. Each accepted
//! layout is paired with the number of leading bytes it occupies, and the
//! layouts are tried in order until one parses.

use crate::errors::LagError;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};

/// Lines shorter than this cannot carry any accepted timestamp.
pub const MIN_LINE_LEN: usize = 32;

const RFC3339_NANO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
const SYSLOG_STAMP_FORMAT: &str = "%Y %b %e %H:%M:%S%.f";
const PREFIX_PREVIEW_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2017-05-21T22:49:23.314299+00:00`
    Rfc3339,
    /// `May 21 22:49:23.314299123`, as written by rsyslog's traditional file
    /// format with high-precision timestamps. Carries neither year nor zone:
    /// the year is taken from the current clock and the zone is UTC. A stamp
    /// that would land more than [`SYSLOG_FUTURE_TOLERANCE_SECS`] after `now`
    /// was written last year.
    SyslogStamp,
}

/// How far ahead of the clock a yearless stamp may be before it is read as
/// belonging to the previous year.
pub const SYSLOG_FUTURE_TOLERANCE_SECS: i64 = 24 * 60 * 60;

impl TimestampFormat {
    fn parse(self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            // `T` separator only; `parse_from_rfc3339` would also take a space.
            TimestampFormat::Rfc3339 => DateTime::parse_from_str(text, RFC3339_NANO_FORMAT)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            TimestampFormat::SyslogStamp => {
                let ts = parse_syslog_stamp(text, now.year())?;
                if (ts - now).num_seconds() > SYSLOG_FUTURE_TOLERANCE_SECS {
                    return parse_syslog_stamp(text, now.year() - 1);
                }
                Some(ts)
            }
        }
    }
}

fn parse_syslog_stamp(text: &str, year: i32) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(&format!("{year} {text}"), SYSLOG_STAMP_FORMAT)
        .ok()
        .map(|ts| ts.and_utc())
}

/// A timestamp format and the byte width it occupies at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampLayout {
    pub width: usize,
    pub format: TimestampFormat,
}

pub const DEFAULT_LAYOUTS: [TimestampLayout; 2] = [
    TimestampLayout {
        width: 32,
        format: TimestampFormat::Rfc3339,
    },
    TimestampLayout {
        width: 25,
        format: TimestampFormat::SyslogStamp,
    },
];

#[derive(Debug, Clone)]
pub struct TimestampExtractor {
    layouts: Vec<TimestampLayout>,
}

impl Default for TimestampExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LAYOUTS.to_vec())
    }
}

impl TimestampExtractor {
    pub fn new(layouts: Vec<TimestampLayout>) -> Self {
        Self { layouts }
    }

    pub fn layouts(&self) -> &[TimestampLayout] {
        &self.layouts
    }

    /// Parses the timestamp at the start of `line`.
    ///
    /// `now` supplies the year for layouts that omit it.
    pub fn extract(&self, line: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, LagError> {
        if line.len() < MIN_LINE_LEN {
            return Err(LagError::NoTimestampFound {
                len: line.len(),
                min: MIN_LINE_LEN,
            });
        }

        self.layouts
            .iter()
            .find_map(|layout| {
                // A width that splits a multi-byte character cannot match.
                let prefix = line.get(..layout.width)?;
                layout.format.parse(prefix, now)
            })
            .ok_or_else(|| LagError::UnparseableTimestamp {
                prefix: preview(line),
            })
    }
}

fn preview(line: &str) -> String {
    line.char_indices()
        .nth(PREFIX_PREVIEW_LEN)
        .map_or(line, |(end, _)| &line[..end])
        .to_string()
}
