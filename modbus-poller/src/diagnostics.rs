/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Read-only rendering of a loaded configuration.
//!
//! Three views of the same data:
//! * [`ConfigReport`] – human-readable text via `Display`
//! * [`log_config`] – the same content as `tracing` events
//! * [`to_json`] – pretty-printed JSON of the model (connector handles and
//!   timestamps omitted)
//!
//! Nothing in here takes `&mut`.

use std::fmt;

use tracing::info;

use crate::model::{Operation, Slave};

/// Text report over a slave collection.
///
/// ```text
/// Slave #0
///   Type:            TCP
///   Connection:      10.0.0.5
///   ...
///   Operation #0 "Voltage"
///     UnitId:        1
///     Function:      3 (0x03)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConfigReport<'a> {
    slaves: &'a [Slave],
}

impl<'a> ConfigReport<'a> {
    pub fn new(slaves: &'a [Slave]) -> Self {
        Self { slaves }
    }
}

fn value(
    f: &mut fmt::Formatter<'_>,
    indent: usize,
    name: &str,
    v: impl fmt::Display,
) -> fmt::Result {
    writeln!(f, "{:indent$}{:<16} {}", "", format!("{}:", name), v, indent = indent)
}

/// Decimal followed by hex, e.g. `256 (0x100)`.
fn hex_value(f: &mut fmt::Formatter<'_>, indent: usize, name: &str, v: i32) -> fmt::Result {
    value(f, indent, name, format!("{} (0x{:02X})", v, v))
}

impl fmt::Display for ConfigReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.slaves.is_empty() {
            return writeln!(f, "No slaves configured");
        }

        for (i, slave) in self.slaves.iter().enumerate() {
            writeln!(f, "Slave #{}", i)?;
            value(f, 2, "Type", slave.modbus_type)?;
            value(f, 2, "Connection", &slave.connection)?;
            value(f, 2, "HwId", &slave.hw_id)?;
            value(f, 2, "RxPin", slave.rx_pin)?;
            value(f, 2, "TxPin", slave.tx_pin)?;
            value(f, 2, "BaudRate", slave.baud_rate)?;
            value(f, 2, "Config", &slave.serial_config)?;
            value(f, 2, "TcpPort", slave.tcp_port)?;
            value(f, 2, "RetryCount", slave.retry_count)?;
            value(f, 2, "RetryInterval", slave.retry_interval)?;
            value(f, 2, "PollingInterval", slave.polling_interval)?;

            for (j, op) in slave.operations.iter().enumerate() {
                write_operation(f, j, op, slave.effective_interval(op))?;
            }
        }
        Ok(())
    }
}

fn write_operation(
    f: &mut fmt::Formatter<'_>,
    index: usize,
    op: &Operation,
    effective: i32,
) -> fmt::Result {
    writeln!(f, "  Operation #{} {:?}", index, op.display_name)?;
    value(f, 4, "UnitId", op.unit_id)?;
    hex_value(f, 4, "Function", op.function)?;
    hex_value(f, 4, "Address", op.address)?;
    value(f, 4, "Len", op.len)?;
    let interval = if effective > 0 {
        format!("{} ms (effective {} ms)", op.polling_interval, effective)
    } else {
        format!("{} ms (never polled)", op.polling_interval)
    };
    value(f, 4, "PollingInterval", interval)
}

/// Emit one `info!` event per slave and per operation.
pub fn log_config(slaves: &[Slave]) {
    info!("Loaded {} slave(s):", slaves.len());
    for (i, slave) in slaves.iter().enumerate() {
        info!(
            "  [{i}] type={kind} connection={conn:?} hw_id={hw:?} interval={interval}ms ops={ops}",
            i = i,
            kind = slave.modbus_type,
            conn = slave.connection,
            hw = slave.hw_id,
            interval = slave.polling_interval,
            ops = slave.operations.len(),
        );
        for op in &slave.operations {
            info!(
                "      {name:?} unit={unit} fn=0x{func:02X} addr=0x{addr:04X} len={len} every={every}ms",
                name = op.display_name,
                unit = op.unit_id,
                func = op.function,
                addr = op.address,
                len = op.len,
                every = slave.effective_interval(op),
            );
        }
    }
}

/// Serialise the collection as pretty-printed JSON.
pub fn to_json(slaves: &[Slave]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(slaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    fn sample() -> Vec<Slave> {
        ConfigLoader::default()
            .parse(
                r#"{ "slaves": [ { "Type": "TCP", "Connection": "10.0.0.5", "PollingInterval": 0,
                "Operations": [
                    { "UnitId": 1, "Function": 3, "Address": 256, "PollingInterval": 500, "DisplayName": "Voltage" },
                    { "UnitId": 1, "Function": 4, "Address": 16, "DisplayName": "Idle" } ] } ] }"#,
            )
            .unwrap()
    }

    #[test]
    fn report_lists_slave_and_operation_fields() {
        let slaves = sample();
        let text = ConfigReport::new(&slaves).to_string();

        assert!(text.contains("Slave #0"));
        assert!(text.contains("TCP"));
        assert!(text.contains("10.0.0.5"));
        assert!(text.contains("Operation #0 \"Voltage\""));
        assert!(text.contains("256 (0x100)"));
        assert!(text.contains("3 (0x03)"));
        assert!(text.contains("500 ms (effective 500 ms)"));
        assert!(text.contains("never polled"));
    }

    #[test]
    fn empty_report() {
        assert_eq!(ConfigReport::new(&[]).to_string(), "No slaves configured\n");
    }

    #[test]
    fn rendering_does_not_touch_timestamps() {
        let mut slaves = sample();
        slaves[0].operations[0].last_poll_timestamp = 1234;
        let before = slaves.clone();

        let _ = ConfigReport::new(&slaves).to_string();
        log_config(&slaves);
        let _ = to_json(&slaves).unwrap();

        assert_eq!(slaves, before);
    }

    #[test]
    fn json_dump_uses_type_token_and_skips_runtime_state() {
        let slaves = sample();
        let json: serde_json::Value = serde_json::from_str(&to_json(&slaves).unwrap()).unwrap();

        assert_eq!(json[0]["type"], "TCP");
        assert_eq!(json[0]["operations"][0]["display_name"], "Voltage");
        assert!(json[0].get("connector").is_none());
        assert!(json[0]["operations"][0].get("last_poll_timestamp").is_none());
    }
}
