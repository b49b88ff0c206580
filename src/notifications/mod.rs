//! Notification queue and presentation core
//!
//! Producers raise notifications onto a bounded queue. Two read-only
//! projections route each record to one of two presentation channels:
//!
//! - a single banner slot showing the current record, dismissed by position
//! - a toast stack showing every toast record, each dismissed by id
//!
//! Records auto-expire (banner after 10s, toasts after 6s by default) through
//! a per-record timer registry.
pub mod bus;
pub mod center;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod integration;
pub mod manager;
pub mod scheduler;
pub mod selectors;
pub mod timers;
pub mod types;

pub use bus::{BusState, NotificationBus};
pub use center::NotificationCenter;
pub use classifier::classify;
pub use config::{CurrentPolicy, NotificationConfig};
pub use error::{ConfigError, NotificationError};
pub use integration::{report_http_failure, report_success, HttpFailure, NotificationSink};
pub use manager::{NotificationHandle, NotificationService};
pub use scheduler::AutoExpiryScheduler;
pub use selectors::BannerView;
pub use timers::{ManualTimers, TokioTimers};
pub use types::{Command, DisplayType, NotificationId, NotificationRecord, RaiseRequest, Severity};
