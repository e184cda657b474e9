//! Slave / operation configuration loading.
//!
//! The expected JSON structure is:
//! ```json
//! { "slaves": [
//!     { "Type": "TCP", "Connection": "192.168.1.10", "TcpPort": 502,
//!       "PollingInterval": 1000,
//!       "Operations": [
//!         { "UnitId": 1, "Function": 3, "Address": 0, "Len": 10,
//!           "PollingInterval": 500, "DisplayName": "Voltage L1" } ] } ] }
//! ```
//!
//! Unknown keys are ignored.  Every slave field has a default taken from
//! [`ConfigDefaults`]; an operation must carry `UnitId`, `Function` and
//! `Address`.
//!
//! [`ConfigLoader::parse`] is pure: it either returns a complete
//! `Vec<Slave>` or an error, never a partial result.

pub mod error;
pub mod tree;

pub use error::{ConfigError, FieldPath};
pub use tree::{ConfigNode, ConfigTree, JsonKind};

use tracing::debug;

use crate::model::{ModbusType, Operation, Slave};

// ── JSON keys ─────────────────────────────────────────────────────────────────

pub const SLAVES_KEY: &str = "slaves";
pub const OPERATIONS_KEY: &str = "Operations";

const KEY_TYPE: &str = "Type";
const KEY_CONNECTION: &str = "Connection";
const KEY_RX_PIN: &str = "RxPin";
const KEY_TX_PIN: &str = "TxPin";
const KEY_RETRY_COUNT: &str = "RetryCount";
const KEY_RETRY_INTERVAL: &str = "RetryInterval";
const KEY_POLLING_INTERVAL: &str = "PollingInterval";
const KEY_HW_ID: &str = "HwId";
const KEY_BAUD_RATE: &str = "BaudRate";
const KEY_SERIAL_CONFIG: &str = "Config";
const KEY_TCP_PORT: &str = "TcpPort";

const KEY_UNIT_ID: &str = "UnitId";
const KEY_FUNCTION: &str = "Function";
const KEY_ADDRESS: &str = "Address";
const KEY_LEN: &str = "Len";
const KEY_DISPLAY_NAME: &str = "DisplayName";

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Standard 8 data bits, no parity, 1 stop bit.
pub const DEFAULT_SERIAL_CONFIG: &str = "SERIAL_8N1";

/// Values used for keys absent from the JSON document.
///
/// Built once at startup (see the `--default-*` CLI flags) and handed to the
/// loader explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDefaults {
    /// Slave-level polling interval in ms.
    pub polling_interval: i32,
    pub retry_count: i32,
    /// Delay between retries in ms.
    pub retry_interval: i32,
    pub rx_pin: i32,
    pub tx_pin: i32,
    pub baud_rate: i32,
    pub tcp_port: i32,
    pub serial_config: String,
    /// Register / coil count of an operation.
    pub operation_len: i32,
    /// Operation-level interval; `0` inherits the slave's.
    pub operation_polling_interval: i32,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            polling_interval: 1000,
            retry_count: 3,
            retry_interval: 100,
            rx_pin: 16,
            tx_pin: 17,
            baud_rate: 9600,
            tcp_port: 502,
            serial_config: DEFAULT_SERIAL_CONFIG.to_string(),
            operation_len: 1,
            operation_polling_interval: 0,
        }
    }
}

// ── ConfigLoader ──────────────────────────────────────────────────────────────

/// Turns JSON text into a fresh slave collection.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    defaults: ConfigDefaults,
}

impl ConfigLoader {
    pub fn new(defaults: ConfigDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ConfigDefaults {
        &self.defaults
    }

    /// Parse `json` into slaves with all timestamps at 0.
    ///
    /// A document without a `slaves` key yields an empty collection.
    ///
    /// # Errors
    /// * [`ConfigError::Parse`] on bad JSON syntax
    /// * [`ConfigError::TypeMismatch`] when a key holds the wrong JSON type
    /// * [`ConfigError::MissingField`] when an operation lacks a required key
    /// * [`ConfigError::InvalidField`] for an unknown `Type` token or an
    ///   integer outside the `i32` range
    pub fn parse(&self, json: &str) -> Result<Vec<Slave>, ConfigError> {
        let tree = ConfigTree::parse(json)?;
        tree.root()
            .get_array(SLAVES_KEY)?
            .iter()
            .map(|node| self.parse_slave(node))
            .collect()
    }

    fn parse_slave(&self, node: &ConfigNode<'_>) -> Result<Slave, ConfigError> {
        let d = &self.defaults;

        let modbus_type = match node.get_opt_string(KEY_TYPE)? {
            None => ModbusType::None,
            Some(token) => {
                ModbusType::from_token(token).ok_or_else(|| ConfigError::InvalidField {
                    path: node.path().field(KEY_TYPE),
                    value: format!("{:?}", token),
                    reason: "expected one of \"RTU\", \"TCP\", \"NONE\"".to_string(),
                })?
            }
        };

        let mut slave = Slave {
            connector: None,
            modbus_type,
            connection: node.get_string(KEY_CONNECTION, "")?,
            rx_pin: node.get_int(KEY_RX_PIN, d.rx_pin)?,
            tx_pin: node.get_int(KEY_TX_PIN, d.tx_pin)?,
            retry_count: node.get_int(KEY_RETRY_COUNT, d.retry_count)?,
            retry_interval: node.get_int(KEY_RETRY_INTERVAL, d.retry_interval)?,
            hw_id: node.get_string(KEY_HW_ID, "")?,
            baud_rate: node.get_int(KEY_BAUD_RATE, d.baud_rate)?,
            serial_config: node.get_string(KEY_SERIAL_CONFIG, &d.serial_config)?,
            tcp_port: node.get_int(KEY_TCP_PORT, d.tcp_port)?,
            polling_interval: node.get_int(KEY_POLLING_INTERVAL, d.polling_interval)?,
            last_poll_timestamp: 0,
            operations: Vec::new(),
        };

        for op_node in node.get_array(OPERATIONS_KEY)? {
            slave.operations.push(self.parse_operation(&op_node)?);
        }

        debug!(
            path = %node.path(),
            kind = %slave.modbus_type,
            connection = %slave.connection,
            interval_ms = slave.polling_interval,
            operations = slave.operations.len(),
            "parsed slave"
        );

        Ok(slave)
    }

    fn parse_operation(&self, node: &ConfigNode<'_>) -> Result<Operation, ConfigError> {
        let d = &self.defaults;

        let op = Operation {
            polling_interval: node.get_int(KEY_POLLING_INTERVAL, d.operation_polling_interval)?,
            last_poll_timestamp: 0,
            unit_id: node.require_int(KEY_UNIT_ID)?,
            function: node.require_int(KEY_FUNCTION)?,
            address: node.require_int(KEY_ADDRESS)?,
            len: node.get_int(KEY_LEN, d.operation_len)?,
            display_name: node.get_string(KEY_DISPLAY_NAME, "")?,
        };

        debug!(
            path = %node.path(),
            unit_id = op.unit_id,
            function = op.function,
            address = op.address,
            len = op.len,
            name = %op.display_name,
            "parsed operation"
        );

        Ok(op)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
