//! Time and id sources injected into the bus

use crate::notifications::types::NotificationId;
use chrono::{DateTime, Utc};

/// Source of record timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of record ids. Every id handed out must be distinct.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> NotificationId;
}

/// Random UUID v4 ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> NotificationId {
        NotificationId::generate()
    }
}

/// Predictable ids (`n1`, `n2`, ...) for scripted replays and tests
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("n")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> NotificationId {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        NotificationId::from(id)
    }
}
