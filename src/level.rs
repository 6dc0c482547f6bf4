//! Severity levels used to filter and label log messages.
use crate::core::QueryLogError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Severity of a log message, ordered from least to most severe.
///
/// The discriminants are part of the public contract: callers may persist or
/// compare levels numerically, so they must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum SeverityLevel {
    Trace = -1,
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    /// Emits the message, then terminates the process.
    Fatal = 4,
    /// Emits the message, then unwinds the calling stack.
    Panic = 5,
}

/// Threshold used by a freshly built collector.
pub const DEFAULT_LEVEL: SeverityLevel = SeverityLevel::Warn;

impl SeverityLevel {
    /// All levels, least severe first.
    pub const ALL: [SeverityLevel; 7] = [
        SeverityLevel::Trace,
        SeverityLevel::Debug,
        SeverityLevel::Info,
        SeverityLevel::Warn,
        SeverityLevel::Error,
        SeverityLevel::Fatal,
        SeverityLevel::Panic,
    ];

    /// Returns the fixed uppercase display name.
    pub fn name(self) -> &'static str {
        match self {
            SeverityLevel::Trace => "TRACE",
            SeverityLevel::Debug => "DEBUG",
            SeverityLevel::Info => "INFO",
            SeverityLevel::Warn => "WARN",
            SeverityLevel::Error => "ERROR",
            SeverityLevel::Fatal => "FATAL",
            SeverityLevel::Panic => "PANIC",
        }
    }

    /// Returns the numeric value of the level.
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

/// Looks up the display name of a raw ordinal; unknown ordinals have no name.
pub fn name_of(ordinal: i8) -> &'static str {
    SeverityLevel::try_from(ordinal).map_or("", SeverityLevel::name)
}

impl TryFrom<i8> for SeverityLevel {
    type Error = QueryLogError;

    fn try_from(value: i8) -> Result<Self, QueryLogError> {
        SeverityLevel::ALL
            .into_iter()
            .find(|level| level.as_i8() == value)
            .ok_or_else(|| QueryLogError::InvalidLevel(value.to_string()))
    }
}

impl FromStr for SeverityLevel {
    type Err = QueryLogError;

    /// Parses a display name. Matching is case-sensitive; `WARNING` is
    /// accepted as an alias of `WARN`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRACE" => Ok(SeverityLevel::Trace),
            "DEBUG" => Ok(SeverityLevel::Debug),
            "INFO" => Ok(SeverityLevel::Info),
            "WARN" | "WARNING" => Ok(SeverityLevel::Warn),
            "ERROR" => Ok(SeverityLevel::Error),
            "FATAL" => Ok(SeverityLevel::Fatal),
            "PANIC" => Ok(SeverityLevel::Panic),
            other => Err(QueryLogError::InvalidLevel(other.to_string())),
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SeverityLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SeverityLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
