//! Timer drivers used by the auto-expiry scheduler
//!
//! A driver arms one-shot timers and hands back a cancellable handle. When a
//! timer runs out, its [`TimerTicket`] is delivered back to the owner of the
//! bus, which feeds it to the scheduler.
//!
//! - [`TokioTimers`] spawns a sleeping task per timer and delivers tickets
//!   over an mpsc channel.
//! - [`ManualTimers`] keeps timers on a virtual timeline that only moves when
//!   the caller advances it. It doubles as the [`Clock`] for that timeline.

use crate::notifications::clock::Clock;
use crate::notifications::types::NotificationId;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Identifies one arming of a timer for a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerTicket {
    pub id: NotificationId,
    /// Distinguishes this arming from earlier ones for the same id
    pub token: u64,
}

/// Handle to an armed timer
pub trait TimerHandle: Send {
    fn cancel(self);
}

/// Something that can arm one-shot timers
pub trait TimerDriver: Send {
    type Handle: TimerHandle;

    fn arm(&mut self, ticket: TimerTicket, delay: Duration) -> Self::Handle;
}

/// Timers backed by tokio tasks
#[derive(Debug, Clone)]
pub struct TokioTimers {
    expired_sender: mpsc::UnboundedSender<TimerTicket>,
}

impl TokioTimers {
    /// Create a driver and the receiver its expired tickets arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerTicket>) {
        let (expired_sender, expired_receiver) = mpsc::unbounded_channel();
        (Self { expired_sender }, expired_receiver)
    }
}

impl TimerHandle for JoinHandle<()> {
    fn cancel(self) {
        self.abort();
    }
}

impl TimerDriver for TokioTimers {
    type Handle = JoinHandle<()>;

    fn arm(&mut self, ticket: TimerTicket, delay: Duration) -> Self::Handle {
        let sender = self.expired_sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sender.send(ticket) {
                warn!("Dropped expired timer, receiver is gone: {}", e);
            }
        })
    }
}

#[derive(Debug)]
struct PendingTimer {
    seq: u64,
    deadline: Duration,
    ticket: TimerTicket,
}

#[derive(Debug)]
struct ManualState {
    origin: DateTime<Utc>,
    elapsed: Duration,
    next_seq: u64,
    pending: Vec<PendingTimer>,
}

/// Virtual timeline with manually advanced time.
///
/// Clones share the same timeline, so one clone can be handed to the
/// scheduler while another is kept to drive time.
#[derive(Debug, Clone)]
pub struct ManualTimers {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimers {
    /// Timeline starting at the current wall-clock time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                origin,
                elapsed: Duration::ZERO,
                next_seq: 0,
                pending: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Time elapsed since the origin
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Number of armed timers that have neither fired nor been cancelled
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Earliest pending deadline, measured from the origin
    pub fn next_deadline(&self) -> Option<Duration> {
        self.lock().pending.iter().map(|p| p.deadline).min()
    }

    /// Pop the earliest timer due at or before `limit`, moving time to its
    /// deadline. Ties fire in arming order.
    pub fn pop_due(&self, limit: Duration) -> Option<TimerTicket> {
        let mut state = self.lock();
        let index = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.deadline <= limit)
            .min_by_key(|(_, p)| (p.deadline, p.seq))
            .map(|(index, _)| index)?;
        let timer = state.pending.remove(index);
        if timer.deadline > state.elapsed {
            state.elapsed = timer.deadline;
        }
        Some(timer.ticket)
    }

    /// Move time forward to `target` without firing anything. Never moves
    /// time backwards.
    pub fn set_elapsed(&self, target: Duration) {
        let mut state = self.lock();
        if target > state.elapsed {
            state.elapsed = target;
        }
    }
}

impl Default for ManualTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualTimers {
    fn now(&self) -> DateTime<Utc> {
        let state = self.lock();
        chrono::Duration::from_std(state.elapsed)
            .ok()
            .and_then(|offset| state.origin.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Handle to a timer on a [`ManualTimers`] timeline
#[derive(Debug)]
pub struct ManualHandle {
    seq: u64,
    state: Arc<Mutex<ManualState>>,
}

impl TimerHandle for ManualHandle {
    fn cancel(self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.pending.retain(|p| p.seq != self.seq);
    }
}

impl TimerDriver for ManualTimers {
    type Handle = ManualHandle;

    fn arm(&mut self, ticket: TimerTicket, delay: Duration) -> Self::Handle {
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let deadline = state.elapsed + delay;
        state.pending.push(PendingTimer {
            seq,
            deadline,
            ticket,
        });
        ManualHandle {
            seq,
            state: Arc::clone(&self.state),
        }
    }
}
