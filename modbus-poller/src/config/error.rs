/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for configuration loading.
//!
//! Every variant except [`ConfigError::Parse`] carries a [`FieldPath`] so the
//! caller always knows *which* slave, *which* operation and *which* key failed
//! without parsing the message text.
//!
//! All of these are load-time errors.  The polling scheduler itself never
//! fails.

use std::fmt;

use thiserror::Error;

use super::tree::JsonKind;

// ── FieldPath ─────────────────────────────────────────────────────────────────

/// Location of a value inside the configuration document.
///
/// Renders as `slaves[1].Operations[0].Address`, `slaves[2].Type`, `slaves`,
/// or `$` for the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    slave: Option<usize>,
    operation: Option<usize>,
    field: Option<String>,
}

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the slave at `index` in the top-level array.
    pub fn slave(index: usize) -> Self {
        Self {
            slave: Some(index),
            ..Self::default()
        }
    }

    /// Path of operation `index` under this path's slave.
    pub fn operation(&self, index: usize) -> Self {
        Self {
            slave: self.slave,
            operation: Some(index),
            field: None,
        }
    }

    /// Path of key `name` under this path.
    pub fn field(&self, name: &str) -> Self {
        Self {
            slave: self.slave,
            operation: self.operation,
            field: Some(name.to_string()),
        }
    }

    pub fn slave_index(&self) -> Option<usize> {
        self.slave
    }

    pub fn operation_index(&self) -> Option<usize> {
        self.operation
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        if let Some(s) = self.slave {
            write!(f, "{}[{}]", super::SLAVES_KEY, s)?;
            wrote = true;
        }
        if let Some(o) = self.operation {
            write!(f, ".{}[{}]", super::OPERATIONS_KEY, o)?;
        }
        match &self.field {
            Some(name) if wrote => write!(f, ".{}", name),
            Some(name) => f.write_str(name),
            None if !wrote => f.write_str("$"),
            None => Ok(()),
        }
    }
}

// ── ConfigError ───────────────────────────────────────────────────────────────

/// Error returned by [`ConfigLoader::parse`](super::ConfigLoader::parse) and
/// [`PollScheduler::load`](crate::scheduler::PollScheduler::load).
///
/// A failed load never installs a partial model; the previous configuration
/// stays active.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The text is not syntactically valid JSON.
    ///
    /// `line` / `column` are 1-based and come straight from the JSON parser.
    #[error("JSON parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// A key is present but holds the wrong JSON type.
    #[error("type mismatch at '{path}': expected {expected}, found {actual}")]
    TypeMismatch {
        path: FieldPath,
        expected: JsonKind,
        actual: JsonKind,
    },

    /// A required key with no default is absent.
    #[error("missing required field '{path}'")]
    MissingField { path: FieldPath },

    /// A value has the right type but is not acceptable (unknown `Type`
    /// token, integer outside the `i32` range).
    #[error("invalid value {value} at '{path}': {reason}")]
    InvalidField {
        path: FieldPath,
        value: String,
        reason: String,
    },
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}

impl ConfigError {
    /// The location of the offending value, if the error has one.
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            ConfigError::Parse { .. } => None,
            ConfigError::TypeMismatch { path, .. }
            | ConfigError::MissingField { path }
            | ConfigError::InvalidField { path, .. } => Some(path),
        }
    }
}
