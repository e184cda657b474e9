/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Typed, read-only view over the parsed JSON document.
//!
//! The loader never touches `serde_json::Value` directly; it walks
//! [`ConfigNode`]s, which know their own [`FieldPath`] and turn every lookup
//! into either a typed value, the caller's default, or a [`ConfigError`]
//! naming the exact location.
//!
//! Lookup rules:
//! * absent key or JSON `null` → the supplied default
//! * present with the wrong JSON type → [`ConfigError::TypeMismatch`]
//! * integer outside the `i32` range → [`ConfigError::InvalidField`]

use std::fmt;

use serde_json::{Map, Value};

use super::error::{ConfigError, FieldPath};

// ── JsonKind ──────────────────────────────────────────────────────────────────

/// Coarse JSON type of a value, used in type-mismatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(n) if n.is_f64() => JsonKind::Float,
            Value::Number(_) => JsonKind::Integer,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Integer => "integer",
            JsonKind::Float => "float",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        })
    }
}

// ── ConfigTree ────────────────────────────────────────────────────────────────

/// An owned, parsed configuration document.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    root: Value,
}

impl ConfigTree {
    /// Parse `text` as JSON.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] with the parser's line/column on bad syntax.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_json::from_str(text)?;
        Ok(Self { root })
    }

    /// View of the document root.
    pub fn root(&self) -> ConfigNode<'_> {
        ConfigNode {
            value: &self.root,
            path: FieldPath::root(),
        }
    }
}

// ── ConfigNode ────────────────────────────────────────────────────────────────

/// A borrowed JSON value together with its location in the document.
#[derive(Debug, Clone)]
pub struct ConfigNode<'a> {
    value: &'a Value,
    path: FieldPath,
}

impl<'a> ConfigNode<'a> {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// String at `key`, or `default` when absent.
    pub fn get_string(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        match self.lookup(key)? {
            None => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.mismatch(key, JsonKind::String, other)),
        }
    }

    /// Optional string at `key`.
    pub fn get_opt_string(&self, key: &str) -> Result<Option<&'a str>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.mismatch(key, JsonKind::String, other)),
        }
    }

    /// Integer at `key`, or `default` when absent.
    pub fn get_int(&self, key: &str, default: i32) -> Result<i32, ConfigError> {
        Ok(self.get_opt_int(key)?.unwrap_or(default))
    }

    /// Integer at `key`; absence is a [`ConfigError::MissingField`].
    pub fn require_int(&self, key: &str) -> Result<i32, ConfigError> {
        self.get_opt_int(key)?
            .ok_or_else(|| ConfigError::MissingField {
                path: self.path.field(key),
            })
    }

    /// Optional integer at `key`.
    pub fn get_opt_int(&self, key: &str) -> Result<Option<i32>, ConfigError> {
        let value = match self.lookup(key)? {
            None => return Ok(None),
            Some(v) => v,
        };
        let wide = match value {
            Value::Number(n) if n.is_i64() => n.as_i64(),
            // Only reachable for integers above i64::MAX
            Value::Number(n) if n.is_u64() => None,
            other => return Err(self.mismatch(key, JsonKind::Integer, other)),
        };
        wide.and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidField {
                path: self.path.field(key),
                value: value.to_string(),
                reason: "integer does not fit in 32 bits".to_string(),
            })
    }

    /// Elements of the array at `key`; an absent key yields no elements.
    ///
    /// Elements of the top-level array are addressed as slaves, elements of
    /// an array nested in a slave as that slave's operations.
    pub fn get_array(&self, key: &str) -> Result<Vec<ConfigNode<'a>>, ConfigError> {
        let items = match self.lookup(key)? {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(other) => return Err(self.mismatch(key, JsonKind::Array, other)),
        };
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, value)| ConfigNode {
                value,
                path: match self.path.slave_index() {
                    None => FieldPath::slave(i),
                    Some(_) => self.path.operation(i),
                },
            })
            .collect())
    }

    /// `true` if `key` is present with a non-null value.
    pub fn contains(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.lookup(key)?.is_some())
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn object(&self) -> Result<&'a Map<String, Value>, ConfigError> {
        match self.value {
            Value::Object(map) => Ok(map),
            other => Err(ConfigError::TypeMismatch {
                path: self.path.clone(),
                expected: JsonKind::Object,
                actual: JsonKind::of(other),
            }),
        }
    }

    fn lookup(&self, key: &str) -> Result<Option<&'a Value>, ConfigError> {
        Ok(self.object()?.get(key).filter(|v| !v.is_null()))
    }

    fn mismatch(&self, key: &str, expected: JsonKind, actual: &Value) -> ConfigError {
        ConfigError::TypeMismatch {
            path: self.path.field(key),
            expected,
            actual: JsonKind::of(actual),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
