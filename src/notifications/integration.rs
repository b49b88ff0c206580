//! Producer-side integration
//!
//! Producers never touch the bus directly. They describe what happened (a
//! failed HTTP call, a completed domain operation) and hand the resulting
//! command to a [`NotificationSink`].

use crate::notifications::bus::NotificationBus;
use crate::notifications::center::NotificationCenter;
use crate::notifications::timers::TimerDriver;
use crate::notifications::types::{Command, DisplayType, RaiseRequest, Severity};
use serde_json::Value;
use tracing::debug;

/// Anything that accepts notification commands
pub trait NotificationSink {
    fn submit(&mut self, command: Command);
}

impl NotificationSink for NotificationBus {
    fn submit(&mut self, command: Command) {
        self.dispatch(command);
    }
}

impl<D: TimerDriver> NotificationSink for NotificationCenter<D> {
    fn submit(&mut self, command: Command) {
        self.dispatch(command);
    }
}

impl NotificationSink for Vec<Command> {
    fn submit(&mut self, command: Command) {
        self.push(command);
    }
}

/// A failed network call as seen by the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    /// HTTP status, or 0 when the request never got a response
    pub status: i32,
    pub status_text: String,
    /// Message supplied by the server in the error body
    pub server_message: Option<String>,
}

impl HttpFailure {
    pub fn new<S: Into<String>>(status: i32, status_text: S) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            server_message: None,
        }
    }

    pub fn with_server_message<S: Into<String>>(mut self, message: S) -> Self {
        self.server_message = Some(message.into());
        self
    }

    /// Build a failure from a raw response body.
    ///
    /// JSON bodies of the form `{"message": ..}`, `{"error": ..}` or
    /// `{"error": {"message": ..}}` provide the server message. Anything else
    /// is ignored.
    pub fn from_response_body<S: Into<String>>(status: i32, status_text: S, body: &str) -> Self {
        let failure = Self::new(status, status_text);
        match Self::extract_server_message(body) {
            Some(message) => failure.with_server_message(message),
            None => failure,
        }
    }

    fn extract_server_message(body: &str) -> Option<String> {
        let value: Value = serde_json::from_str(body).ok()?;
        let candidate = value
            .get("message")
            .or_else(|| value.get("error").and_then(|error| error.get("message")))
            .or_else(|| value.get("error"))?;
        candidate
            .as_str()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string)
    }

    /// Text shown to the user: the server message, else the status text
    pub fn display_message(&self) -> String {
        if let Some(message) = self.server_message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
        if !self.status_text.trim().is_empty() {
            return self.status_text.clone();
        }
        if self.status == 0 {
            "Request failed: no response from server".to_string()
        } else {
            format!("Request failed with status {}", self.status)
        }
    }

    pub fn to_command(&self) -> Command {
        Command::Raise(RaiseRequest::new(self.display_message(), self.status))
    }
}

/// Raise a notification for a failed network call
pub fn report_http_failure<S: NotificationSink + ?Sized>(sink: &mut S, failure: &HttpFailure) {
    debug!("Reporting HTTP failure with status {}", failure.status);
    sink.submit(failure.to_command());
}

/// Raise a success confirmation for a completed domain operation
pub fn report_success<S, M>(sink: &mut S, message: M, display_type: Option<DisplayType>)
where
    S: NotificationSink + ?Sized,
    M: Into<String>,
{
    let mut request = RaiseRequest::new(message, 200).severity(Severity::Success);
    request.display_type = display_type;
    sink.submit(Command::Raise(request));
}
