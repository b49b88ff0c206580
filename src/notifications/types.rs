use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

impl Severity {
    /// Lowercase wire name of this severity
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Success => "success",
        }
    }

    /// Get the icon shown next to a notification of this severity
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Error => "✗",
            Severity::Warning => "⚠",
            Severity::Info => "ℹ",
            Severity::Success => "✓",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            "success" => Ok(Severity::Success),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Presentation channel a notification is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    /// Single persistent slot showing one record at a time
    #[default]
    Banner,
    /// Stacked list showing every toast record at once
    Toast,
}

impl DisplayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayType::Banner => "banner",
            DisplayType::Toast => "toast",
        }
    }
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for DisplayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "banner" => Ok(DisplayType::Banner),
            "toast" => Ok(DisplayType::Toast),
            other => Err(format!("unknown display type '{}'", other)),
        }
    }
}

/// Unique identifier of a notification record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NotificationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NotificationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable unit of user-facing feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    id: NotificationId,
    message: String,
    status: i32,
    display_type: DisplayType,
    notification_type: Severity,
    timestamp: DateTime<Utc>,
}

impl NotificationRecord {
    /// Build a record from already-resolved parts
    pub fn new(
        id: NotificationId,
        message: String,
        status: i32,
        display_type: DisplayType,
        notification_type: Severity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            message,
            status,
            display_type,
            notification_type,
            timestamp,
        }
    }

    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn display_type(&self) -> DisplayType {
        self.display_type
    }

    pub fn notification_type(&self) -> Severity {
        self.notification_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_banner(&self) -> bool {
        self.display_type == DisplayType::Banner
    }

    pub fn is_toast(&self) -> bool {
        self.display_type == DisplayType::Toast
    }
}

/// Raise payload as sent by producers, before defaults are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiseRequest {
    pub message: String,
    /// Missing status classifies as an error
    #[serde(default)]
    pub status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<DisplayType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<Severity>,
}

impl RaiseRequest {
    pub fn new<S: Into<String>>(message: S, status: i32) -> Self {
        Self {
            message: message.into(),
            status,
            display_type: None,
            notification_type: None,
        }
    }

    /// Route to a specific channel instead of the bus default
    pub fn display_type(mut self, display_type: DisplayType) -> Self {
        self.display_type = Some(display_type);
        self
    }

    /// Override the status-derived severity
    pub fn severity(mut self, severity: Severity) -> Self {
        self.notification_type = Some(severity);
        self
    }
}

/// Commands accepted by the notification bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    Raise(RaiseRequest),
    RaiseMultiple { records: Vec<RaiseRequest> },
    /// Remove the head of the queue
    Dismiss,
    DismissById { id: NotificationId },
    /// Same as `Dismiss`
    Clear,
    ClearAll,
    SetDisplayType { display_type: DisplayType },
    SetMaxQueueSize { max_size: usize },
}

impl Command {
    /// Short name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Command::Raise(_) => "raise",
            Command::RaiseMultiple { .. } => "raiseMultiple",
            Command::Dismiss => "dismiss",
            Command::DismissById { .. } => "dismissById",
            Command::Clear => "clear",
            Command::ClearAll => "clearAll",
            Command::SetDisplayType { .. } => "setDisplayType",
            Command::SetMaxQueueSize { .. } => "setMaxQueueSize",
        }
    }
}
