// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lag estimation for log forwarders.
//!
//! A forwarder such as fluentd records how far it has read each log file in a
//! position file: `<path>\t<hex offset>\t<hex inode>`. This crate turns that
//! checkpoint into the wall-clock timestamp of the last forwarded line, so the
//! caller can report `now - timestamp` as the forwarder's delay.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod clock;
pub mod errors;
pub mod estimator;
pub mod line_reader;
pub mod position;
pub mod rotation;
pub mod timestamp;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::LagError;
pub use estimator::{LagEstimator, Provenance, ResolvedTimestamp};
pub use position::PositionRecord;
pub use rotation::{FileIdentity, FileInspector, Rotation, StatInspector};
pub use timestamp::{TimestampExtractor, TimestampFormat, TimestampLayout};
