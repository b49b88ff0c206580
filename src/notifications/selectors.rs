//! Read-only channel projections over the bus state
//!
//! Both channels read the same queue. The banner slot shows only the
//! current record and is dismissed by position (head of queue); the toast
//! stack shows every toast record and each one is dismissed by id.

use crate::notifications::bus::BusState;
use crate::notifications::types::NotificationRecord;

/// What the banner slot shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerView<'a> {
    pub current: &'a NotificationRecord,
    /// Other banner records still queued
    pub pending: usize,
    /// First queued banner record other than `current`
    pub next: Option<&'a NotificationRecord>,
}

pub fn banner_visible(state: &BusState) -> bool {
    state.is_visible() && state.current().map(NotificationRecord::is_banner).unwrap_or(false)
}

/// Banner projection, `None` when the slot is hidden
pub fn banner(state: &BusState) -> Option<BannerView<'_>> {
    let current = state.current().filter(|record| record.is_banner())?;
    let mut others = state
        .queue()
        .iter()
        .filter(|record| record.is_banner() && record.id() != current.id());
    let next = others.next();
    let pending = next.map(|_| 1 + others.count()).unwrap_or(0);

    Some(BannerView {
        current,
        pending,
        next,
    })
}

pub fn toast_visible(state: &BusState) -> bool {
    state.queue().iter().any(NotificationRecord::is_toast)
}

/// Every queued toast record, oldest first
pub fn toasts(state: &BusState) -> Vec<&NotificationRecord> {
    state.queue().iter().filter(|record| record.is_toast()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::bus::NotificationBus;
    use crate::notifications::clock::SequentialIds;
    use crate::notifications::config::NotificationConfig;
    use crate::notifications::timers::ManualTimers;
    use crate::notifications::types::{Command, DisplayType, RaiseRequest, Severity};
    use std::sync::Arc;

    fn bus() -> NotificationBus {
        NotificationBus::with_sources(
            &NotificationConfig::default(),
            Arc::new(ManualTimers::new()),
            Box::new(SequentialIds::default()),
        )
    }

    fn raise(bus: &mut NotificationBus, message: &str, display_type: DisplayType) {
        bus.dispatch(Command::Raise(
            RaiseRequest::new(message, 500).display_type(display_type),
        ));
    }

    #[test]
    fn test_empty_state_shows_nothing() {
        let bus = bus();
        let state = bus.state();
        assert!(!banner_visible(&state));
        assert!(banner(&state).is_none());
        assert!(!toast_visible(&state));
        assert!(toasts(&state).is_empty());
    }

    #[test]
    fn test_channels_are_independent() {
        let mut bus = bus();
        bus.dispatch(Command::Raise(
            RaiseRequest::new("Saved", 200)
                .display_type(DisplayType::Toast)
                .severity(Severity::Success),
        ));
        let state = bus.dispatch(Command::Raise(
            RaiseRequest::new("Network error", 503).display_type(DisplayType::Banner),
        ));

        let toast_records = toasts(&state);
        assert_eq!(toast_records.len(), 1);
        assert_eq!(toast_records[0].message(), "Saved");
        assert_eq!(toast_records[0].notification_type(), Severity::Success);

        let view = banner(&state).unwrap();
        assert_eq!(view.current.message(), "Network error");
        assert_eq!(view.current.notification_type(), Severity::Error);
        assert_eq!(view.pending, 0);
        assert!(view.next.is_none());
    }

    #[test]
    fn test_banner_hidden_when_current_is_toast() {
        let mut bus = bus();
        raise(&mut bus, "banner", DisplayType::Banner);
        raise(&mut bus, "toast", DisplayType::Toast);
        let state = bus.state();
        assert!(state.is_visible());
        assert!(!banner_visible(&state));
        assert!(toast_visible(&state));
    }

    #[test]
    fn test_toasts_render_all_not_just_current() {
        let mut bus = bus();
        raise(&mut bus, "t1", DisplayType::Toast);
        raise(&mut bus, "b1", DisplayType::Banner);
        raise(&mut bus, "t2", DisplayType::Toast);
        let state = bus.state();
        let messages: Vec<_> = toasts(&state).iter().map(|r| r.message()).collect();
        assert_eq!(messages, vec!["t1", "t2"]);
    }

    #[test]
    fn test_banner_pending_and_next() {
        let mut bus = bus();
        raise(&mut bus, "b1", DisplayType::Banner);
        raise(&mut bus, "t1", DisplayType::Toast);
        raise(&mut bus, "b2", DisplayType::Banner);
        raise(&mut bus, "b3", DisplayType::Banner);

        let state = bus.state();
        let view = banner(&state).unwrap();
        assert_eq!(view.current.message(), "b3");
        assert_eq!(view.pending, 2);
        assert_eq!(view.next.unwrap().message(), "b1");
    }

    #[test]
    fn test_banner_dismiss_is_positional() {
        let mut bus = bus();
        raise(&mut bus, "t1", DisplayType::Toast);
        raise(&mut bus, "b1", DisplayType::Banner);

        // the head is the toast, so dismissing removes it rather than the banner
        let state = bus.dispatch(Command::Dismiss);
        assert!(!toast_visible(&state));
        assert_eq!(banner(&state).unwrap().current.message(), "b1");
    }
}
