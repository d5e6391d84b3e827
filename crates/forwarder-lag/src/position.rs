// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parsing of forwarder position files.
//!
//! A position file holds a single record of three tab-separated fields:
//!
//! ```text
//! <log file path>\t<byte offset, hex>\t<inode, hex>[\n]
//! ```

use crate::errors::LagError;
use std::path::PathBuf;
use std::str::FromStr;

const FIELD_DELIMITER: char = '\t';
const FIELD_COUNT: usize = 3;

/// Where the forwarder stands in one log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRecord {
    pub log_file: PathBuf,
    /// Last byte of the most recently consumed line.
    pub offset: u64,
    pub inode: u64,
}

impl PositionRecord {
    /// Decodes the raw contents of a position file.
    pub fn parse(data: &[u8]) -> Result<Self, LagError> {
        let text = std::str::from_utf8(data).map_err(|e| {
            LagError::MalformedCheckpoint(format!("position data is not valid UTF-8: {e}"))
        })?;
        text.parse()
    }
}

impl FromStr for PositionRecord {
    type Err = LagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(FIELD_DELIMITER).collect();
        if parts.len() != FIELD_COUNT {
            return Err(LagError::MalformedCheckpoint(format!(
                "expected {FIELD_COUNT} tab-separated fields, found {}: {s:?}",
                parts.len()
            )));
        }

        let log_file = parts[0];
        if log_file.is_empty() {
            return Err(LagError::MalformedCheckpoint(
                "log file path not found in position data".to_string(),
            ));
        }

        Ok(PositionRecord {
            log_file: PathBuf::from(log_file),
            offset: parse_hex_field(parts[1], "offset")?,
            inode: parse_hex_field(parts[2], "inode")?,
        })
    }
}

fn parse_hex_field(field: &str, name: &str) -> Result<u64, LagError> {
    let trimmed = field.trim_end();
    u64::from_str_radix(trimmed, 16).map_err(|e| {
        LagError::MalformedCheckpoint(format!("invalid hexadecimal {name} {trimmed:?}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_record() {
        let record = PositionRecord::parse(b"/var/log/app.log\t1a\t2b\n").unwrap();
        assert_eq!(
            record,
            PositionRecord {
                log_file: PathBuf::from("/var/log/app.log"),
                offset: 26,
                inode: 43,
            }
        );
    }

    #[test]
    fn test_parse_record_without_trailing_newline() {
        let record = PositionRecord::parse(b"./messages\t0a\t04").unwrap();
        assert_eq!(record.log_file, PathBuf::from("./messages"));
        assert_eq!(record.offset, 10);
        assert_eq!(record.inode, 4);
    }

    #[test]
    fn test_parse_record_fluentd_padding() {
        // fluentd writes zero-padded 16 digit offsets and 8 digit inodes
        let record =
            PositionRecord::parse(b"/var/log/messages\t00000000000004d2\t0001a2b3\r\n").unwrap();
        assert_eq!(record.offset, 1234);
        assert_eq!(record.inode, 0x1a2b3);
    }

    #[test]
    fn test_non_hex_offset_is_rejected() {
        let err = PositionRecord::parse(b"/a/file/path\tpoo\t04\n").unwrap_err();
        assert!(matches!(err, LagError::MalformedCheckpoint(_)));
        assert!(err.to_string().contains("offset"));
    }

    #[test]
    fn test_non_hex_inode_is_rejected() {
        let err = PositionRecord::parse(b"/a/file/path\t04\tzz\n").unwrap_err();
        assert!(matches!(err, LagError::MalformedCheckpoint(_)));
        assert!(err.to_string().contains("inode"));
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let err = PositionRecord::parse(b"\t04\t03\n").unwrap_err();
        assert!(matches!(err, LagError::MalformedCheckpoint(_)));
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        for data in [
            &b""[..],
            b"/a/file/path",
            b"/a/file/path\t04",
            b"/a/file/path\t04\t03\t02\n",
        ] {
            assert!(
                matches!(
                    PositionRecord::parse(data),
                    Err(LagError::MalformedCheckpoint(_))
                ),
                "{data:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_numeric_fields_are_rejected() {
        assert!(PositionRecord::parse(b"/a\t\t03\n").is_err());
        assert!(PositionRecord::parse(b"/a\t04\t\n").is_err());
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let err = PositionRecord::parse(b"/a/\xff\t04\t03\n").unwrap_err();
        assert!(matches!(err, LagError::MalformedCheckpoint(_)));
    }

    proptest! {
        #[test]
        fn test_well_formed_records_parse(
            path in "/[a-zA-Z0-9_./-]{1,64}",
            offset in any::<u64>(),
            inode in any::<u64>(),
            newline in any::<bool>(),
        ) {
            let data = format!(
                "{path}\t{offset:016x}\t{inode:x}{}",
                if newline { "\n" } else { "" }
            );
            let record = PositionRecord::parse(data.as_bytes()).unwrap();
            prop_assert_eq!(record.log_file, PathBuf::from(path));
            prop_assert_eq!(record.offset, offset);
            prop_assert_eq!(record.inode, inode);
        }
    }
}
