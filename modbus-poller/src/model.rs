/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core data structures for the polling scheduler.
//!
//! ```text
//! PollScheduler ──owns──► Vec<Slave> ──owns──► Vec<Operation>
//!                           ↑ connection params      ↑ unit/function/address/len
//!                           opaque to scheduling      opaque to scheduling
//! ```
//!
//! # Ownership model
//! Every [`Operation`] is owned by exactly one [`Slave`], and the slave
//! collection is owned by the scheduler.  A reload builds a brand-new
//! `Vec<Slave>` and swaps it in, so nothing ever points into a stale
//! collection.

use serde::Serialize;

/// Wrapping monotonic millisecond counter supplied by the host.
///
/// 32 bits wide, so it rolls over after ~49.7 days.  All elapsed-time
/// arithmetic goes through [`crate::scheduler::timing`].
pub type Millis = u32;

// ── Transport type ────────────────────────────────────────────────────────────

/// Transport family of a slave.
///
/// Selects which connection fields are meaningful (RTU: pins, baud rate,
/// serial config; TCP: connection string and port).  The scheduler never
/// looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModbusType {
    /// Serial line (Modbus RTU).
    Rtu,
    /// Modbus TCP.
    Tcp,
    /// No transport bound.
    #[default]
    None,
}

impl ModbusType {
    /// Map a case-sensitive JSON token onto the enum.
    ///
    /// Returns `None` for anything other than `"RTU"`, `"TCP"` or `"NONE"`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "RTU" => Some(ModbusType::Rtu),
            "TCP" => Some(ModbusType::Tcp),
            "NONE" => Some(ModbusType::None),
            _ => None,
        }
    }

    /// The JSON token for this type.
    pub fn as_token(self) -> &'static str {
        match self {
            ModbusType::Rtu => "RTU",
            ModbusType::Tcp => "TCP",
            ModbusType::None => "NONE",
        }
    }
}

impl std::fmt::Display for ModbusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

// ── Connector handle ──────────────────────────────────────────────────────────

/// Opaque identifier of a transport object owned by the caller.
///
/// The core stores it and hands it back through the callback's `&Slave`; it
/// never dereferences, opens or closes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectorHandle(pub usize);

// ── Operation ─────────────────────────────────────────────────────────────────

/// One schedulable poll request belonging to a [`Slave`].
///
/// `unit_id`, `function`, `address` and `len` are passed through to the
/// callback untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Operation {
    /// Own interval in ms.  `<= 0` means "inherit the slave's interval".
    pub polling_interval: i32,

    /// Timestamp of the last fire; `0` until the operation first fires.
    #[serde(skip)]
    pub last_poll_timestamp: Millis,

    pub unit_id: i32,
    pub function: i32,
    pub address: i32,
    pub len: i32,

    /// Human-readable label, only used for diagnostics.
    pub display_name: String,
}

impl Operation {
    /// Interval actually used for this operation: its own if positive,
    /// otherwise `slave_interval`.
    ///
    /// A result `<= 0` means the operation is never scheduled.
    pub fn effective_interval(&self, slave_interval: i32) -> i32 {
        if self.polling_interval > 0 {
            self.polling_interval
        } else {
            slave_interval
        }
    }
}

// ── Slave ─────────────────────────────────────────────────────────────────────

/// One configured device / connection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Slave {
    /// Transport object bound by the caller, if any.
    #[serde(skip)]
    pub connector: Option<ConnectorHandle>,

    #[serde(rename = "type")]
    pub modbus_type: ModbusType,

    // ── Connection parameters (opaque to scheduling) ──────────────────────────
    /// Host name / IP for TCP, port name for RTU.
    pub connection: String,
    pub rx_pin: i32,
    pub tx_pin: i32,
    pub retry_count: i32,
    /// Delay between retries in ms.
    pub retry_interval: i32,
    pub hw_id: String,
    pub baud_rate: i32,
    /// Serial line setting token, e.g. `SERIAL_8N1`.
    pub serial_config: String,
    pub tcp_port: i32,

    // ── Scheduling ────────────────────────────────────────────────────────────
    /// Default interval in ms for operations that do not set their own.
    pub polling_interval: i32,

    /// Timestamp of the most recent fire of any of this slave's operations.
    ///
    /// Bookkeeping only: it never gates firing.
    #[serde(skip)]
    pub last_poll_timestamp: Millis,

    /// Poll requests in configuration order; this is also the firing order.
    pub operations: Vec<Operation>,
}

impl Slave {
    /// Effective interval of `operation` when it belongs to this slave.
    pub fn effective_interval(&self, operation: &Operation) -> i32 {
        operation.effective_interval(self.polling_interval)
    }

    /// Number of operations that can ever fire (effective interval > 0).
    pub fn schedulable_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| self.effective_interval(op) > 0)
            .count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
