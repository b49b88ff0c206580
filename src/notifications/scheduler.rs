//! Auto-expiry of displayed notifications
//!
//! Each record gets at most one armed timer, kept in a registry keyed by
//! record id. A toast is armed as soon as it is queued; a banner record is
//! armed once it occupies the banner slot. Timers are cancelled when their
//! record leaves the queue by any path, and a firing is only honoured if it
//! matches the arming still held in the registry.

use crate::notifications::bus::BusState;
use crate::notifications::config::NotificationConfig;
use crate::notifications::selectors;
use crate::notifications::timers::{TimerDriver, TimerHandle, TimerTicket};
use crate::notifications::types::{Command, DisplayType, NotificationId};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

struct ArmedTimer<H> {
    token: u64,
    channel: DisplayType,
    handle: H,
}

/// Per-record expiry timers layered on top of the bus
pub struct AutoExpiryScheduler<D: TimerDriver> {
    driver: D,
    banner_timeout: Duration,
    toast_timeout: Duration,
    armed: HashMap<NotificationId, ArmedTimer<D::Handle>>,
    next_token: u64,
}

impl<D: TimerDriver> AutoExpiryScheduler<D> {
    pub fn new(driver: D, config: &NotificationConfig) -> Self {
        Self::with_timeouts(driver, config.banner_timeout(), config.toast_timeout())
    }

    pub fn with_timeouts(driver: D, banner_timeout: Duration, toast_timeout: Duration) -> Self {
        Self {
            driver,
            banner_timeout,
            toast_timeout,
            armed: HashMap::new(),
            next_token: 0,
        }
    }

    /// Bring the timer registry in line with a new bus state
    pub fn sync(&mut self, state: &BusState) {
        let live: HashSet<&NotificationId> = state.queue().iter().map(|record| record.id()).collect();
        let gone: Vec<NotificationId> = self
            .armed
            .keys()
            .filter(|id| !live.contains(id))
            .cloned()
            .collect();
        for id in gone {
            self.cancel(&id);
        }

        for record in selectors::toasts(state) {
            if !self.armed.contains_key(record.id()) {
                self.arm(record.id().clone(), DisplayType::Toast);
            }
        }

        if let Some(view) = selectors::banner(state) {
            if !self.armed.contains_key(view.current.id()) {
                self.arm(view.current.id().clone(), DisplayType::Banner);
            }
        }
    }

    /// Resolve an expired timer into the command it should issue.
    ///
    /// Returns `None` for a firing that no longer matches an armed timer,
    /// e.g. one that was cancelled after it had already run out.
    pub fn expire(&mut self, ticket: &TimerTicket) -> Option<Command> {
        match self.armed.get(&ticket.id) {
            Some(timer) if timer.token == ticket.token => {}
            _ => {
                debug!("Ignoring stale expiry for notification {}", ticket.id);
                return None;
            }
        }

        let timer = self.armed.remove(&ticket.id)?;
        debug!("{} timer for notification {} expired", timer.channel, ticket.id);
        Some(match timer.channel {
            DisplayType::Banner => Command::Dismiss,
            DisplayType::Toast => Command::DismissById {
                id: ticket.id.clone(),
            },
        })
    }

    /// Cancel every armed timer
    pub fn cancel_all(&mut self) {
        for (id, timer) in self.armed.drain() {
            debug!("Cancelled {} timer for notification {}", timer.channel, id);
            timer.handle.cancel();
        }
    }

    pub fn is_armed(&self, id: &NotificationId) -> bool {
        self.armed.contains_key(id)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn arm(&mut self, id: NotificationId, channel: DisplayType) {
        let token = self.next_token;
        self.next_token += 1;
        let delay = match channel {
            DisplayType::Banner => self.banner_timeout,
            DisplayType::Toast => self.toast_timeout,
        };
        let handle = self.driver.arm(
            TimerTicket {
                id: id.clone(),
                token,
            },
            delay,
        );
        debug!(
            "Armed {} timer for notification {} ({} ms)",
            channel,
            id,
            delay.as_millis()
        );
        self.armed.insert(
            id,
            ArmedTimer {
                token,
                channel,
                handle,
            },
        );
    }

    fn cancel(&mut self, id: &NotificationId) {
        if let Some(timer) = self.armed.remove(id) {
            debug!("Cancelled {} timer for notification {}", timer.channel, id);
            timer.handle.cancel();
        }
    }
}

impl<D: TimerDriver> Drop for AutoExpiryScheduler<D> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::bus::NotificationBus;
    use crate::notifications::clock::SequentialIds;
    use crate::notifications::timers::ManualTimers;
    use crate::notifications::types::RaiseRequest;
    use std::sync::Arc;

    fn setup() -> (NotificationBus, AutoExpiryScheduler<ManualTimers>, ManualTimers) {
        let config = NotificationConfig::default();
        let timers = ManualTimers::new();
        let bus = NotificationBus::with_sources(
            &config,
            Arc::new(timers.clone()),
            Box::new(SequentialIds::default()),
        );
        let scheduler = AutoExpiryScheduler::new(timers.clone(), &config);
        (bus, scheduler, timers)
    }

    fn toast(message: &str) -> Command {
        Command::Raise(RaiseRequest::new(message, 200).display_type(DisplayType::Toast))
    }

    fn banner(message: &str) -> Command {
        Command::Raise(RaiseRequest::new(message, 500).display_type(DisplayType::Banner))
    }

    #[test]
    fn test_toast_armed_once_across_state_changes() {
        let (mut bus, mut scheduler, timers) = setup();
        let state = bus.dispatch(toast("t1"));
        scheduler.sync(&state);
        let id = state.queue()[0].id().clone();
        assert!(scheduler.is_armed(&id));

        for message in ["t2", "t3"] {
            let state = bus.dispatch(toast(message));
            scheduler.sync(&state);
        }
        assert_eq!(scheduler.armed_count(), 3);
        assert_eq!(timers.pending(), 3);
    }

    #[test]
    fn test_toast_expiry_dismisses_by_id() {
        let (mut bus, mut scheduler, timers) = setup();
        let state = bus.dispatch(toast("t1"));
        scheduler.sync(&state);
        let id = state.queue()[0].id().clone();

        let ticket = timers.pop_due(Duration::from_millis(6_000)).unwrap();
        assert_eq!(scheduler.expire(&ticket), Some(Command::DismissById { id }));
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[test]
    fn test_banner_armed_when_shown() {
        let (mut bus, mut scheduler, timers) = setup();
        let state = bus.dispatch(banner("b1"));
        scheduler.sync(&state);
        assert!(scheduler.is_armed(state.queue()[0].id()));

        let ticket = timers.pop_due(Duration::from_millis(10_000)).unwrap();
        assert_eq!(scheduler.expire(&ticket), Some(Command::Dismiss));
    }

    #[test]
    fn test_hidden_banner_is_not_armed() {
        let (mut bus, mut scheduler, timers) = setup();
        bus.dispatch(banner("b1"));
        // the toast takes `current`, so the banner slot is hidden
        let state = bus.dispatch(toast("t1"));
        scheduler.sync(&state);
        assert!(!scheduler.is_armed(state.queue()[0].id()));
        assert!(scheduler.is_armed(state.queue()[1].id()));
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn test_removed_record_cancels_timer() {
        let (mut bus, mut scheduler, timers) = setup();
        let state = bus.dispatch(toast("t1"));
        scheduler.sync(&state);
        let id = state.queue()[0].id().clone();

        let state = bus.dispatch(Command::DismissById { id: id.clone() });
        scheduler.sync(&state);
        assert!(!scheduler.is_armed(&id));
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_eviction_cancels_timer() {
        let (mut bus, mut scheduler, timers) = setup();
        for message in ["t1", "t2", "t3"] {
            let state = bus.dispatch(toast(message));
            scheduler.sync(&state);
        }
        let state = bus.dispatch(Command::SetMaxQueueSize { max_size: 1 });
        scheduler.sync(&state);
        assert_eq!(scheduler.armed_count(), 1);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let (mut bus, mut scheduler, timers) = setup();
        let state = bus.dispatch(banner("b1"));
        scheduler.sync(&state);
        let ticket = timers.pop_due(Duration::from_millis(10_000)).unwrap();

        // the record leaves before its firing is processed
        let state = bus.dispatch(Command::ClearAll);
        scheduler.sync(&state);
        assert_eq!(scheduler.expire(&ticket), None);
    }

    #[test]
    fn test_toast_and_banner_expire_independently() {
        let (mut bus, mut scheduler, timers) = setup();
        bus.dispatch(toast("t1"));
        let state = bus.dispatch(banner("b1"));
        scheduler.sync(&state);
        let b1 = state.queue()[1].id().clone();

        let ticket = timers.pop_due(Duration::from_millis(10_000)).unwrap();
        assert_eq!(timers.elapsed(), Duration::from_millis(6_000));
        let state = bus.dispatch(scheduler.expire(&ticket).unwrap());
        scheduler.sync(&state);
        assert_eq!(state.current().unwrap().id(), &b1);

        let ticket = timers.pop_due(Duration::from_millis(10_000)).unwrap();
        assert_eq!(ticket.id, b1);
        let state = bus.dispatch(scheduler.expire(&ticket).unwrap());
        scheduler.sync(&state);
        assert!(state.is_empty());
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[test]
    fn test_banner_rearmed_after_positional_dismiss() {
        let (mut bus, mut scheduler, timers) = setup();
        bus.dispatch(banner("b0"));
        let state = bus.dispatch(banner("b1"));
        scheduler.sync(&state);
        let b1 = state.queue()[1].id().clone();
        assert_eq!(scheduler.armed_count(), 1);

        // b1's firing dismisses the head, which is b0
        let ticket = timers.pop_due(Duration::from_millis(10_000)).unwrap();
        let state = bus.dispatch(scheduler.expire(&ticket).unwrap());
        scheduler.sync(&state);
        assert_eq!(state.len(), 1);
        assert_eq!(state.current().unwrap().id(), &b1);
        assert!(scheduler.is_armed(&b1));
        assert_eq!(timers.next_deadline(), Some(Duration::from_millis(20_000)));
    }

    #[test]
    fn test_drop_cancels_everything() {
        let (mut bus, mut scheduler, timers) = setup();
        let state = bus.dispatch(toast("t1"));
        scheduler.sync(&state);
        drop(scheduler);
        assert_eq!(timers.pending(), 0);
    }
}
