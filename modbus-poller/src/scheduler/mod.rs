//! Two-level polling scheduler.
//!
//! [`PollScheduler`] owns the slave collection and the user callback.  The
//! host loop calls [`PollScheduler::tick`] with its monotonic millisecond
//! counter; every operation whose effective interval has elapsed gets the
//! callback invoked with `(&Slave, &Operation)` and its timestamp reset to
//! `now`.
//!
//! # Design decisions
//!
//! | Topic | Behaviour |
//! |---|---|
//! | Firing order | Slave order, then operation order, both as in the JSON |
//! | Effective interval | Operation's own if `> 0`, else the slave's; `<= 0` never fires |
//! | Counter rollover | Wrapping subtraction, see [`timing`] |
//! | Reload | Whole collection swapped on success; untouched on failure |
//! | Missing callback | Due operations still advance their timestamps; one `warn!` |
//! | Callback error | Logged, timestamp still updated, pass continues |
//! | Threading | Single owner, `&mut self` only; no locks |
//!
//! # Example
//! ```rust
//! use modbus_poller::config::ConfigDefaults;
//! use modbus_poller::model::{Operation, Slave};
//! use modbus_poller::scheduler::PollScheduler;
//!
//! let mut sched = PollScheduler::new(ConfigDefaults::default());
//! sched.set_callback(|slave: &Slave, op: &Operation| {
//!     println!("poll {} on {}", op.display_name, slave.connection);
//!     Ok(())
//! });
//! sched
//!     .load(r#"{ "slaves": [ { "Operations": [
//!         { "UnitId": 1, "Function": 3, "Address": 0, "PollingInterval": 100 } ] } ] }"#)
//!     .unwrap();
//!
//! assert_eq!(sched.tick(50), 0);
//! assert_eq!(sched.tick(100), 1);
//! ```

pub mod timing;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{ConfigDefaults, ConfigError, ConfigLoader};
use crate::model::{ConnectorHandle, Millis, Operation, Slave};

/// Callback invoked for every due operation.
///
/// The references are only valid for the duration of the call.  An `Err`
/// is logged and otherwise ignored.
pub type PollCallback = Box<dyn FnMut(&Slave, &Operation) -> Result<()>>;

// ── PollScheduler ─────────────────────────────────────────────────────────────

/// Owns the loaded configuration and dispatches due operations.
pub struct PollScheduler {
    loader: ConfigLoader,
    slaves: Vec<Slave>,
    callback: Option<PollCallback>,

    /// Set after the first successful [`load`](Self::load).
    loaded: bool,

    /// Suppresses repeated "no callback" warnings.
    warned_no_callback: bool,
}

impl PollScheduler {
    /// Create an empty scheduler that fills absent JSON keys from `defaults`.
    pub fn new(defaults: ConfigDefaults) -> Self {
        Self {
            loader: ConfigLoader::new(defaults),
            slaves: Vec::new(),
            callback: None,
            loaded: false,
            warned_no_callback: false,
        }
    }

    /// Register the callback, replacing any previous one.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Slave, &Operation) -> Result<()> + 'static,
    {
        self.callback = Some(Box::new(callback));
        self.warned_no_callback = false;
    }

    /// Returns `true` if a callback is registered.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    /// Parse `json` and replace the slave collection with the result.
    ///
    /// All timestamps of the new collection start at 0 and no connector is
    /// attached.
    ///
    /// # Errors
    /// Any [`ConfigError`].  On error the previously loaded slaves stay
    /// installed and keep being scheduled.
    pub fn load(&mut self, json: &str) -> Result<(), ConfigError> {
        let slaves = self.loader.parse(json)?;

        let op_count: usize = slaves.iter().map(|s| s.operations.len()).sum();
        let schedulable: usize = slaves.iter().map(Slave::schedulable_count).sum();
        info!(
            slaves = slaves.len(),
            operations = op_count,
            schedulable = schedulable,
            "configuration loaded"
        );
        if schedulable < op_count {
            debug!(
                disabled = op_count - schedulable,
                "operations with no positive interval will never fire"
            );
        }

        self.slaves = slaves;
        self.loaded = true;
        Ok(())
    }

    /// Read `path` as UTF-8 and [`load`](Self::load) it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the content does not
    /// load.  The previous configuration is kept in both cases.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading polling configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        self.load(&content)
            .with_context(|| format!("Failed to load configuration file: {}", path.display()))
    }

    /// Returns `true` after a successful [`load`](Self::load).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn slaves(&self) -> &[Slave] {
        &self.slaves
    }

    pub fn defaults(&self) -> &ConfigDefaults {
        self.loader.defaults()
    }

    /// Bind the caller's transport handle to slave `index`.
    ///
    /// Returns `false` if no such slave is loaded.  Handles are dropped with
    /// the collection on the next successful load.
    pub fn attach_connector(&mut self, index: usize, handle: ConnectorHandle) -> bool {
        match self.slaves.get_mut(index) {
            Some(slave) => {
                slave.connector = Some(handle);
                true
            }
            None => false,
        }
    }

    // ── Polling ───────────────────────────────────────────────────────────────

    /// Run one scheduling pass at time `now` and return the number of
    /// operations that fired.
    ///
    /// Operations are visited in slave order, then operation order.  Each due
    /// operation's callback runs to completion before the next one is
    /// checked.
    pub fn tick(&mut self, now: Millis) -> usize {
        if self.callback.is_none() && !self.warned_no_callback && !self.slaves.is_empty() {
            warn!("no polling callback registered; due operations are not dispatched");
            self.warned_no_callback = true;
        }

        let mut fired = 0usize;

        for (slave_idx, slave) in self.slaves.iter_mut().enumerate() {
            for op_idx in 0..slave.operations.len() {
                let op = &slave.operations[op_idx];
                let interval = op.effective_interval(slave.polling_interval);
                if !timing::is_due(now, op.last_poll_timestamp, interval) {
                    continue;
                }

                debug!(
                    slave = slave_idx,
                    operation = op_idx,
                    name = %op.display_name,
                    interval_ms = interval,
                    elapsed_ms = timing::elapsed(now, op.last_poll_timestamp),
                    "operation due"
                );

                if let Some(callback) = self.callback.as_mut() {
                    if let Err(e) = callback(&*slave, op) {
                        warn!(
                            slave = slave_idx,
                            operation = op_idx,
                            name = %op.display_name,
                            "polling callback failed: {:#}",
                            e
                        );
                    }
                }

                slave.operations[op_idx].last_poll_timestamp = now;
                slave.last_poll_timestamp = now;
                fired += 1;
            }
        }

        fired
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(ConfigDefaults::default())
    }
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("slaves", &self.slaves.len())
            .field("has_callback", &self.callback.is_some())
            .field("loaded", &self.loaded)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModbusType;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;
    use tempfile::NamedTempFile;

    // ── Test helpers ──────────────────────────────────────────────────────────

    type Log = Rc<RefCell<Vec<String>>>;

    /// Scheduler whose callback records `"<slave connection>/<op name>"`.
    fn recording_scheduler(json: &str) -> (PollScheduler, Log) {
        let log: Log = Rc::default();
        let sink = Rc::clone(&log);
        let mut sched = PollScheduler::default();
        sched.set_callback(move |slave: &Slave, op: &Operation| {
            sink.borrow_mut()
                .push(format!("{}/{}", slave.connection, op.display_name));
            Ok(())
        });
        sched.load(json).unwrap();
        (sched, log)
    }

    fn drain(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    const TCP_EXAMPLE: &str = r#"{ "slaves": [ { "Type": "TCP", "TcpPort": 502, "Operations": [
        { "UnitId": 1, "Function": 3, "Address": 0, "Len": 10,
          "PollingInterval": 1000, "DisplayName": "X" } ] } ] }"#;

    // ── Firing semantics ──────────────────────────────────────────────────────

    #[test]
    fn tcp_example_fires_once_after_interval() {
        let (mut sched, log) = recording_scheduler(TCP_EXAMPLE);

        assert_eq!(sched.slaves().len(), 1);
        let slave = &sched.slaves()[0];
        assert_eq!(slave.modbus_type, ModbusType::Tcp);
        assert_eq!(slave.operations.len(), 1);
        assert_eq!(slave.effective_interval(&slave.operations[0]), 1000);

        assert_eq!(sched.tick(0), 0);
        assert!(drain(&log).is_empty());

        assert_eq!(sched.tick(1000), 1);
        assert_eq!(drain(&log), ["/X"]);
        assert_eq!(sched.slaves()[0].operations[0].last_poll_timestamp, 1000);
    }

    #[test]
    fn same_now_twice_fires_only_once() {
        let (mut sched, log) = recording_scheduler(TCP_EXAMPLE);
        assert_eq!(sched.tick(1000), 1);
        assert_eq!(sched.tick(1000), 0);
        assert_eq!(drain(&log).len(), 1);
    }

    #[test]
    fn fires_again_one_interval_after_last_fire() {
        let (mut sched, log) = recording_scheduler(TCP_EXAMPLE);
        sched.tick(1200);
        assert_eq!(sched.tick(2199), 0);
        assert_eq!(sched.tick(2200), 1);
        assert_eq!(sched.slaves()[0].operations[0].last_poll_timestamp, 2200);
        assert_eq!(drain(&log).len(), 2);
    }

    #[test]
    fn late_tick_fires_once_not_once_per_missed_interval() {
        let (mut sched, log) = recording_scheduler(TCP_EXAMPLE);
        assert_eq!(sched.tick(10_500), 1);
        assert_eq!(drain(&log).len(), 1);
        assert_eq!(sched.slaves()[0].operations[0].last_poll_timestamp, 10_500);
    }

    #[test]
    fn firing_order_is_slave_then_operation_order() {
        let json = r#"{ "slaves": [
            { "Connection": "s0", "PollingInterval": 100, "Operations": [
                { "UnitId": 1, "Function": 3, "Address": 0, "DisplayName": "b" },
                { "UnitId": 1, "Function": 3, "Address": 1, "DisplayName": "a" } ] },
            { "Connection": "s1", "PollingInterval": 100, "Operations": [
                { "UnitId": 2, "Function": 3, "Address": 0, "DisplayName": "c" } ] } ] }"#;
        let (mut sched, log) = recording_scheduler(json);

        assert_eq!(sched.tick(100), 3);
        assert_eq!(drain(&log), ["s0/b", "s0/a", "s1/c"]);
    }

    #[test]
    fn operation_interval_overrides_slave_interval() {
        let json = r#"{ "slaves": [ { "PollingInterval": 1000, "Operations": [
            { "UnitId": 1, "Function": 3, "Address": 0, "PollingInterval": 100, "DisplayName": "fast" },
            { "UnitId": 1, "Function": 3, "Address": 1, "DisplayName": "slow" } ] } ] }"#;
        let (mut sched, log) = recording_scheduler(json);

        for now in (100..=1000).step_by(100) {
            sched.tick(now);
        }
        let fired = drain(&log);
        assert_eq!(fired.iter().filter(|f| f.ends_with("fast")).count(), 10);
        assert_eq!(fired.iter().filter(|f| f.ends_with("slow")).count(), 1);
    }

    #[test]
    fn omitted_interval_inherits_slave_interval() {
        let json = r#"{ "slaves": [ { "PollingInterval": 300, "Operations": [
            { "UnitId": 1, "Function": 3, "Address": 0, "DisplayName": "x" } ] } ] }"#;
        let (mut sched, _log) = recording_scheduler(json);
        assert_eq!(sched.tick(299), 0);
        assert_eq!(sched.tick(300), 1);
    }

    #[test]
    fn zero_slave_and_operation_interval_never_fires() {
        let json = r#"{ "slaves": [ { "PollingInterval": 0, "Operations": [
            { "UnitId": 1, "Function": 3, "Address": 0 },
            { "UnitId": 1, "Function": 3, "Address": 1, "PollingInterval": -50 } ] } ] }"#;
        let (mut sched, log) = recording_scheduler(json);

        for now in [0, 1, 1000, u32::MAX / 2, u32::MAX] {
            assert_eq!(sched.tick(now), 0);
        }
        assert!(drain(&log).is_empty());
        assert!(sched.slaves()[0]
            .operations
            .iter()
            .all(|op| op.last_poll_timestamp == 0));
    }

    #[test]
    fn counter_rollover_is_handled() {
        let (mut sched, log) = recording_scheduler(TCP_EXAMPLE);
        let near_wrap = u32::MAX - 200;
        assert_eq!(sched.tick(near_wrap), 1);

        // 200 + 1 + 798 = 999 ms later
        assert_eq!(sched.tick(798), 0);
        // 1000 ms later, after the counter wrapped
        assert_eq!(sched.tick(799), 1);
        assert_eq!(drain(&log).len(), 2);
    }

    #[test]
    fn slave_timestamp_tracks_latest_fire() {
        let (mut sched, _log) = recording_scheduler(TCP_EXAMPLE);
        sched.tick(1000);
        assert_eq!(sched.slaves()[0].last_poll_timestamp, 1000);
    }

    // ── Callback handling ─────────────────────────────────────────────────────

    #[test]
    fn missing_callback_is_a_silent_no_op() {
        let mut sched = PollScheduler::default();
        sched.load(TCP_EXAMPLE).unwrap();
        assert!(!sched.has_callback());

        assert_eq!(sched.tick(1000), 1);
        assert_eq!(sched.slaves()[0].operations[0].last_poll_timestamp, 1000);
        assert_eq!(sched.tick(1000), 0);
    }

    #[test]
    fn failing_callback_does_not_stop_the_pass() {
        let json = r#"{ "slaves": [ { "PollingInterval": 100, "Operations": [
            { "UnitId": 1, "Function": 3, "Address": 0, "DisplayName": "bad" },
            { "UnitId": 1, "Function": 3, "Address": 1, "DisplayName": "good" } ] } ] }"#;
        let seen: Log = Rc::default();
        let sink = Rc::clone(&seen);

        let mut sched = PollScheduler::default();
        sched.set_callback(move |_slave: &Slave, op: &Operation| {
            sink.borrow_mut().push(op.display_name.clone());
            if op.display_name == "bad" {
                anyhow::bail!("transport timeout");
            }
            Ok(())
        });
        sched.load(json).unwrap();

        assert_eq!(sched.tick(100), 2);
        assert_eq!(drain(&seen), ["bad", "good"]);
        assert!(sched.slaves()[0]
            .operations
            .iter()
            .all(|op| op.last_poll_timestamp == 100));
    }

    #[test]
    fn callback_sees_opaque_operation_parameters() {
        let json = r#"{ "slaves": [ { "Operations": [ { "UnitId": 17, "Function": 4,
            "Address": 4096, "Len": 8, "PollingInterval": 10 } ] } ] }"#;
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);

        let mut sched = PollScheduler::default();
        sched.set_callback(move |slave: &Slave, op: &Operation| {
            *sink.borrow_mut() = Some((slave.connector, op.unit_id, op.function, op.address, op.len));
            Ok(())
        });
        sched.load(json).unwrap();
        assert!(sched.attach_connector(0, ConnectorHandle(42)));

        sched.tick(10);
        assert_eq!(
            *seen.borrow(),
            Some((Some(ConnectorHandle(42)), 17, 4, 4096, 8))
        );
    }

    #[test]
    fn attach_connector_rejects_unknown_slave() {
        let mut sched = PollScheduler::default();
        assert!(!sched.attach_connector(0, ConnectorHandle(1)));
    }

    // ── Reloading ─────────────────────────────────────────────────────────────

    #[test]
    fn malformed_reload_keeps_previous_model() {
        let (mut sched, log) = recording_scheduler(TCP_EXAMPLE);
        sched.tick(1000);
        let before = sched.slaves().to_vec();

        let err = sched.load(r#"{ "slaves": [ { "Type": "TCP" "#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(sched.slaves(), before.as_slice());

        // The old configuration is still scheduled.
        assert_eq!(sched.tick(2000), 1);
        assert_eq!(drain(&log).len(), 2);
    }

    #[test]
    fn invalid_type_fails_whole_load_atomically() {
        let (mut sched, _log) = recording_scheduler(TCP_EXAMPLE);
        let err = sched
            .load(r#"{ "slaves": [ { "Type": "RTU" }, { "Type": "CAN" } ] }"#)
            .unwrap_err();
        match err {
            ConfigError::InvalidField { path, .. } => assert_eq!(path.slave_index(), Some(1)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(sched.slaves().len(), 1);
        assert_eq!(sched.slaves()[0].modbus_type, ModbusType::Tcp);
    }

    #[test]
    fn successful_reload_replaces_collection_and_resets_state() {
        let (mut sched, _log) = recording_scheduler(TCP_EXAMPLE);
        sched.attach_connector(0, ConnectorHandle(7));
        sched.tick(1000);

        sched.load(TCP_EXAMPLE).unwrap();
        let slave = &sched.slaves()[0];
        assert_eq!(slave.connector, None);
        assert_eq!(slave.last_poll_timestamp, 0);
        assert_eq!(slave.operations[0].last_poll_timestamp, 0);

        sched
            .load(r#"{ "slaves": [ { "Type": "RTU" }, { "Type": "NONE" } ] }"#)
            .unwrap();
        assert_eq!(sched.slaves().len(), 2);
        assert_eq!(sched.slaves()[0].modbus_type, ModbusType::Rtu);
    }

    // ── File loading ──────────────────────────────────────────────────────────

    #[test]
    fn load_from_file_reads_json() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(TCP_EXAMPLE.as_bytes()).unwrap();

        let mut sched = PollScheduler::default();
        assert!(!sched.is_loaded());
        sched.load_from_file(f.path()).unwrap();
        assert!(sched.is_loaded());
        assert_eq!(sched.slaves().len(), 1);
    }

    #[test]
    fn missing_file_returns_error_and_keeps_model() {
        let (mut sched, _log) = recording_scheduler(TCP_EXAMPLE);
        let result = sched.load_from_file(Path::new("/nonexistent/path/slaves.json"));
        assert!(result.is_err());
        assert_eq!(sched.slaves().len(), 1);
    }

    #[test]
    fn bad_file_content_surfaces_config_error() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"{ \"slaves\": [ { \"Operations\": [ {} ] } ] }")
            .unwrap();

        let mut sched = PollScheduler::default();
        let err = sched.load_from_file(f.path()).unwrap_err();
        let cfg = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(cfg, ConfigError::MissingField { .. }));
        assert!(!sched.is_loaded());
    }
}
