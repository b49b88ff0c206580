//! Bus and expiry scheduler wired together
//!
//! `NotificationCenter` is the synchronous core used both by the async
//! service and by scripted replays. Every change to the queue, whether it
//! comes from a producer or from an expired timer, goes through
//! [`NotificationCenter::dispatch`], after which the timer registry is
//! brought back in line with the new state.

use crate::notifications::bus::{BusState, NotificationBus};
use crate::notifications::clock::{Clock, IdGenerator, SequentialIds};
use crate::notifications::config::NotificationConfig;
use crate::notifications::scheduler::AutoExpiryScheduler;
use crate::notifications::timers::{ManualTimers, TimerDriver, TimerTicket};
use crate::notifications::types::Command;
use std::sync::Arc;
use std::time::Duration;

pub struct NotificationCenter<D: TimerDriver> {
    bus: NotificationBus,
    scheduler: AutoExpiryScheduler<D>,
}

impl<D: TimerDriver> NotificationCenter<D> {
    /// Wall clock and random ids
    pub fn new(config: &NotificationConfig, driver: D) -> Self {
        Self {
            bus: NotificationBus::new(config),
            scheduler: AutoExpiryScheduler::new(driver, config),
        }
    }

    pub fn with_sources(
        config: &NotificationConfig,
        driver: D,
        clock: Arc<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        Self {
            bus: NotificationBus::with_sources(config, clock, ids),
            scheduler: AutoExpiryScheduler::new(driver, config),
        }
    }

    pub fn state(&self) -> Arc<BusState> {
        self.bus.state()
    }

    pub fn scheduler(&self) -> &AutoExpiryScheduler<D> {
        &self.scheduler
    }

    /// Apply a command and re-sync expiry timers
    pub fn dispatch(&mut self, command: Command) -> Arc<BusState> {
        let state = self.bus.dispatch(command);
        self.scheduler.sync(&state);
        state
    }

    /// Handle an expired timer. Stale firings leave the state untouched.
    pub fn expire(&mut self, ticket: TimerTicket) -> Arc<BusState> {
        match self.scheduler.expire(&ticket) {
            Some(command) => self.dispatch(command),
            None => self.state(),
        }
    }

    /// Cancel all pending timers
    pub fn shutdown(&mut self) {
        self.scheduler.cancel_all();
    }
}

impl NotificationCenter<ManualTimers> {
    /// Center on a fresh virtual timeline with sequential ids
    pub fn manual(config: &NotificationConfig) -> Self {
        let timers = ManualTimers::new();
        Self::with_sources(
            config,
            timers.clone(),
            Arc::new(timers),
            Box::new(SequentialIds::default()),
        )
    }

    pub fn elapsed(&self) -> Duration {
        self.scheduler.driver().elapsed()
    }

    /// Move virtual time forward, firing due timers in order
    pub fn advance(&mut self, by: Duration) -> Arc<BusState> {
        let target = self.elapsed() + by;
        while let Some(ticket) = self.scheduler.driver().pop_due(target) {
            self.expire(ticket);
        }
        self.scheduler.driver().set_elapsed(target);
        self.state()
    }
}
