use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::notifications::{
    bus::BusState,
    center::NotificationCenter,
    config::NotificationConfig,
    error::NotificationError,
    integration::NotificationSink,
    selectors,
    timers::{TimerTicket, TokioTimers},
    types::{Command, DisplayType, NotificationId, NotificationRecord, RaiseRequest},
};

/// Messages accepted by the service task
#[derive(Debug)]
enum ServiceMessage {
    Command(Command),
    Shutdown,
}

/// Async notification service.
///
/// A single tokio task owns the bus and its expiry timers. Producers talk to
/// it through cloneable [`NotificationHandle`]s; every applied command
/// publishes a fresh state snapshot to subscribers.
pub struct NotificationService {
    handle: NotificationHandle,
    task: JoinHandle<()>,
}

impl NotificationService {
    /// Start the service on the current tokio runtime
    pub fn spawn(config: NotificationConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (timers, expired) = TokioTimers::new();
        let center = NotificationCenter::new(&config, timers);
        let (state_sender, state_receiver) = watch::channel(center.state());

        let task = tokio::spawn(Self::run(center, receiver, expired, state_sender));

        info!(
            "Notification service started (max queue size {}, banner {} ms, toast {} ms)",
            config.max_queue_size, config.banner_timeout_ms, config.toast_timeout_ms
        );

        Self {
            handle: NotificationHandle {
                sender,
                state: state_receiver,
            },
            task,
        }
    }

    /// Get a handle for producers and views
    pub fn handle(&self) -> NotificationHandle {
        self.handle.clone()
    }

    /// Stop the service task and cancel all pending timers
    pub async fn shutdown(self) {
        if self.handle.sender.send(ServiceMessage::Shutdown).is_err() {
            debug!("Notification service already stopped");
        }
        if let Err(e) = self.task.await {
            error!("Notification service task failed: {}", e);
        }
    }

    async fn run(
        mut center: NotificationCenter<TokioTimers>,
        mut receiver: mpsc::UnboundedReceiver<ServiceMessage>,
        mut expired: mpsc::UnboundedReceiver<TimerTicket>,
        state_sender: watch::Sender<Arc<BusState>>,
    ) {
        loop {
            let state = tokio::select! {
                message = receiver.recv() => match message {
                    Some(ServiceMessage::Command(command)) => center.dispatch(command),
                    Some(ServiceMessage::Shutdown) | None => break,
                },
                Some(ticket) = expired.recv() => center.expire(ticket),
            };

            state_sender.send_if_modified(|published| {
                if Arc::ptr_eq(published, &state) {
                    false
                } else {
                    *published = state;
                    true
                }
            });
        }

        center.shutdown();
        info!("Notification service stopped");
    }
}

/// Cloneable handle to a running [`NotificationService`]
#[derive(Debug, Clone)]
pub struct NotificationHandle {
    sender: mpsc::UnboundedSender<ServiceMessage>,
    state: watch::Receiver<Arc<BusState>>,
}

impl NotificationHandle {
    /// Queue a command for the service
    pub fn send(&self, command: Command) -> Result<(), NotificationError> {
        self.sender
            .send(ServiceMessage::Command(command))
            .map_err(|_| NotificationError::ServiceStopped)
    }

    pub fn raise<S: Into<String>>(&self, message: S, status: i32) -> Result<(), NotificationError> {
        self.send(Command::Raise(RaiseRequest::new(message, status)))
    }

    pub fn raise_request(&self, request: RaiseRequest) -> Result<(), NotificationError> {
        self.send(Command::Raise(request))
    }

    pub fn raise_multiple(&self, records: Vec<RaiseRequest>) -> Result<(), NotificationError> {
        self.send(Command::RaiseMultiple { records })
    }

    /// Dismiss the head of the queue (banner close button)
    pub fn dismiss(&self) -> Result<(), NotificationError> {
        self.send(Command::Dismiss)
    }

    /// Dismiss one record (toast close button)
    pub fn dismiss_by_id(&self, id: NotificationId) -> Result<(), NotificationError> {
        self.send(Command::DismissById { id })
    }

    pub fn clear(&self) -> Result<(), NotificationError> {
        self.send(Command::Clear)
    }

    pub fn clear_all(&self) -> Result<(), NotificationError> {
        self.send(Command::ClearAll)
    }

    pub fn set_display_type(&self, display_type: DisplayType) -> Result<(), NotificationError> {
        self.send(Command::SetDisplayType { display_type })
    }

    pub fn set_max_queue_size(&self, max_size: usize) -> Result<(), NotificationError> {
        self.send(Command::SetMaxQueueSize { max_size })
    }

    /// Latest published state
    pub fn snapshot(&self) -> Arc<BusState> {
        Arc::clone(&self.state.borrow())
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<Arc<BusState>> {
        self.state.clone()
    }

    /// Record shown in the banner slot, if any
    pub fn banner(&self) -> Option<NotificationRecord> {
        let state = self.snapshot();
        selectors::banner(&state).map(|view| view.current.clone())
    }

    /// Records shown in the toast stack
    pub fn toasts(&self) -> Vec<NotificationRecord> {
        let state = self.snapshot();
        selectors::toasts(&state)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl NotificationSink for NotificationHandle {
    fn submit(&mut self, command: Command) {
        let name = command.name();
        if let Err(e) = self.send(command) {
            error!("Failed to submit {} notification command: {}", name, e);
        }
    }
}
