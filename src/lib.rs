pub mod cli;
pub mod notifications;
pub mod replay;

pub use notifications::{NotificationConfig, NotificationHandle, NotificationService};
