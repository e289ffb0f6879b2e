//! Domain layer for influx-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `RawEvent`: a decoded check-result payload
//! - `Point`: one encoded line-protocol point
//! - `ForwarderError`: Top-level error type

pub mod error;
pub mod event;
pub mod point;

pub use error::ForwarderError;
pub use event::{CheckOverrides, CheckResult, ClientRef, EventError, RawEvent};
pub use point::{Point, format_float};
