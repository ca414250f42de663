//! Instance status feed.
//!
//! Whether an instance is running, and on which port, comes from outside
//! (a process-table scan). When a [`StatusSource`] is attached, every
//! instance directory grows two read-only leaves: `up` and `port`.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Leaf reporting whether the instance is running.
pub const UP_FILE: &str = "up";

/// Leaf reporting the instance's listening port.
pub const PORT_FILE: &str = "port";

/// Supplies live status for `(category, instance)` pairs.
pub trait StatusSource: Send + Sync {
    fn is_up(&self, category: &str, instance: &str) -> bool;

    fn port(&self, category: &str, instance: &str) -> Option<u16>;
}

/// Whether `name` is one of the synthetic status leaves.
pub fn is_status_file(name: &str) -> bool {
    name == UP_FILE || name == PORT_FILE
}

/// A [`StatusSource`] fed by pushing updates in, for front-ends that poll
/// the process table themselves (and for tests).
#[derive(Debug, Default)]
pub struct StaticStatus {
    running: RwLock<HashMap<(String, String), Option<u16>>>,
}

impl StaticStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an instance running, optionally on `port`.
    pub fn set_up(&self, category: &str, instance: &str, port: Option<u16>) {
        self.running
            .write()
            .insert((category.to_string(), instance.to_string()), port);
    }

    /// Mark an instance stopped.
    pub fn set_down(&self, category: &str, instance: &str) {
        self.running
            .write()
            .remove(&(category.to_string(), instance.to_string()));
    }
}

impl StatusSource for StaticStatus {
    fn is_up(&self, category: &str, instance: &str) -> bool {
        self.running
            .read()
            .contains_key(&(category.to_string(), instance.to_string()))
    }

    fn port(&self, category: &str, instance: &str) -> Option<u16> {
        self.running
            .read()
            .get(&(category.to_string(), instance.to_string()))
            .copied()
            .flatten()
    }
}
