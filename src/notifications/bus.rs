//! Notification bus
//!
//! The bus owns the authoritative queue of notification records. Every
//! command produces a brand new [`BusState`] behind an `Arc`, so snapshots
//! handed to readers never change underneath them.

use crate::notifications::classifier::classify;
use crate::notifications::clock::{Clock, IdGenerator, SystemClock, UuidIds};
use crate::notifications::config::{CurrentPolicy, NotificationConfig};
use crate::notifications::types::{
    Command, DisplayType, NotificationId, NotificationRecord, RaiseRequest,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Snapshot of the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusState {
    queue: VecDeque<NotificationRecord>,
    current: Option<NotificationId>,
    global_display_type: DisplayType,
    max_queue_size: usize,
    #[serde(skip)]
    policy: CurrentPolicy,
}

impl BusState {
    pub fn new(max_queue_size: usize, global_display_type: DisplayType, policy: CurrentPolicy) -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            global_display_type,
            max_queue_size: max_queue_size.max(1),
            policy,
        }
    }

    pub fn from_config(config: &NotificationConfig) -> Self {
        Self::new(
            config.max_queue_size,
            config.default_display_type,
            config.current_policy,
        )
    }

    /// Queued records, oldest first
    pub fn queue(&self) -> &VecDeque<NotificationRecord> {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn head(&self) -> Option<&NotificationRecord> {
        self.queue.front()
    }

    /// The record currently selected for display
    pub fn current(&self) -> Option<&NotificationRecord> {
        let id = self.current.as_ref()?;
        self.get(id)
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }

    /// Channel of the current record, or the global default when nothing is
    /// showing
    pub fn display_type(&self) -> DisplayType {
        self.current()
            .map(NotificationRecord::display_type)
            .unwrap_or(self.global_display_type)
    }

    /// Channel applied to future raises that do not name one
    pub fn global_display_type(&self) -> DisplayType {
        self.global_display_type
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    pub fn policy(&self) -> CurrentPolicy {
        self.policy
    }

    pub fn get(&self, id: &NotificationId) -> Option<&NotificationRecord> {
        self.queue.iter().find(|record| record.id() == id)
    }

    pub fn contains(&self, id: &NotificationId) -> bool {
        self.get(id).is_some()
    }

    fn head_id(&self) -> Option<NotificationId> {
        self.queue.front().map(|record| record.id().clone())
    }

    /// Drop the oldest records until the queue fits. Returns how many were
    /// evicted.
    fn truncate_to_capacity(&mut self) -> usize {
        let excess = self.queue.len().saturating_sub(self.max_queue_size);
        self.queue.drain(..excess);
        excess
    }

    fn raised(&self, records: Vec<NotificationRecord>) -> (Self, usize) {
        let mut next = self.clone();
        let last = records.last().map(|record| record.id().clone());
        next.queue.extend(records);
        let evicted = next.truncate_to_capacity();
        next.current = match next.policy {
            CurrentPolicy::LatestRaised => last,
            CurrentPolicy::QueueHead => next.head_id(),
        };
        (next, evicted)
    }

    fn without_head(&self) -> Self {
        let mut next = self.clone();
        next.queue.pop_front();
        next.current = next.head_id();
        next
    }

    fn without_id(&self, id: &NotificationId) -> Self {
        let mut next = self.clone();
        next.queue.retain(|record| record.id() != id);
        next.current = next.head_id();
        next
    }

    fn cleared(&self) -> Self {
        let mut next = self.clone();
        next.queue.clear();
        next.current = None;
        next
    }

    fn with_global_display_type(&self, display_type: DisplayType) -> Self {
        let mut next = self.clone();
        next.global_display_type = display_type;
        next
    }

    fn with_max_queue_size(&self, max_size: usize) -> (Self, usize) {
        let mut next = self.clone();
        next.max_queue_size = max_size;
        let evicted = next.truncate_to_capacity();
        let current_survived = next
            .current
            .as_ref()
            .map(|id| next.contains(id))
            .unwrap_or(false);
        if next.policy == CurrentPolicy::QueueHead || !current_survived {
            next.current = next.head_id();
        }
        (next, evicted)
    }
}

/// The notification bus: queue plus command processing
pub struct NotificationBus {
    state: Arc<BusState>,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl NotificationBus {
    /// Create a bus using the wall clock and random ids
    pub fn new(config: &NotificationConfig) -> Self {
        Self::with_sources(config, Arc::new(SystemClock), Box::new(UuidIds))
    }

    /// Create a bus with injected time and id sources
    pub fn with_sources(
        config: &NotificationConfig,
        clock: Arc<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        Self {
            state: Arc::new(BusState::from_config(config)),
            clock,
            ids,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> Arc<BusState> {
        Arc::clone(&self.state)
    }

    fn build_record(&mut self, request: RaiseRequest) -> NotificationRecord {
        let display_type = request
            .display_type
            .unwrap_or(self.state.global_display_type);
        let severity = classify(request.status, request.notification_type);
        NotificationRecord::new(
            self.ids.next_id(),
            request.message,
            request.status,
            display_type,
            severity,
            self.clock.now(),
        )
    }

    /// Apply a command and return the resulting snapshot. Never fails.
    pub fn dispatch(&mut self, command: Command) -> Arc<BusState> {
        let name = command.name();
        let next = match command {
            Command::Raise(request) => {
                let record = self.build_record(request);
                debug!(
                    "Raising {} {} notification {}: {}",
                    record.notification_type(),
                    record.display_type(),
                    record.id(),
                    record.message()
                );
                self.raise_records(vec![record])
            }
            Command::RaiseMultiple { records } => {
                if records.is_empty() {
                    debug!("Ignoring empty raiseMultiple batch");
                    return self.state();
                }
                let records: Vec<_> = records
                    .into_iter()
                    .map(|request| self.build_record(request))
                    .collect();
                debug!("Raising batch of {} notifications", records.len());
                self.raise_records(records)
            }
            Command::Dismiss | Command::Clear => match self.state.head() {
                Some(head) => {
                    debug!("Dismissing head notification {}", head.id());
                    self.state.without_head()
                }
                None => return self.state(),
            },
            Command::DismissById { id } => {
                if !self.state.contains(&id) {
                    debug!("Notification {} not queued, nothing to dismiss", id);
                    return self.state();
                }
                debug!("Dismissing notification {}", id);
                self.state.without_id(&id)
            }
            Command::ClearAll => {
                if self.state.is_empty() {
                    return self.state();
                }
                info!("Clearing {} notifications", self.state.len());
                self.state.cleared()
            }
            Command::SetDisplayType { display_type } => {
                info!("Default display type set to {}", display_type);
                self.state.with_global_display_type(display_type)
            }
            Command::SetMaxQueueSize { max_size } => {
                let max_size = if max_size == 0 {
                    warn!("Rejected max queue size of 0, using 1");
                    1
                } else {
                    max_size
                };
                let (next, evicted) = self.state.with_max_queue_size(max_size);
                if evicted > 0 {
                    info!(
                        "Max queue size set to {}, evicted {} notifications",
                        max_size, evicted
                    );
                } else {
                    info!("Max queue size set to {}", max_size);
                }
                next
            }
        };

        self.state = Arc::new(next);
        debug!(
            "Applied {}: {} queued, visible={}",
            name,
            self.state.len(),
            self.state.is_visible()
        );
        self.state()
    }

    fn raise_records(&self, records: Vec<NotificationRecord>) -> BusState {
        let (next, evicted) = self.state.raised(records);
        if evicted > 0 {
            debug!(
                "Queue over capacity ({}), evicted {} oldest notifications",
                next.max_queue_size, evicted
            );
        }
        next
    }
}
