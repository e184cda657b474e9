/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Modbus polling scheduler
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── model/        – Slave / Operation data model
//! ├── config/       – JSON loading, defaults, typed tree adapter, errors
//! ├── scheduler/    – tick-driven per-operation polling
//! ├── diagnostics/  – read-only text / log / JSON rendering
//! └── util/         – hex-or-decimal integer parsing
//! ```
//!
//! The crate never talks Modbus itself: it decides *when* an operation is
//! due and hands it to a caller-supplied callback that owns the transport.

pub mod config;
pub mod diagnostics;
pub mod model;
pub mod scheduler;
pub mod util;
