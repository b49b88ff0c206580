//! Scripted replays on virtual time
//!
//! A script is a JSON array of steps. Each step is either a bus command in
//! its wire format or `{"advanceMs": N}` to move the virtual clock forward.
//! Records get sequential ids (`n1`, `n2`, ...) so scripts can dismiss them
//! by id.

use crate::notifications::{selectors, BusState, Command, NotificationCenter, NotificationConfig};
use serde::Deserialize;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub type ScriptResult<T> = Result<T, ScriptError>;

/// Errors raised while loading a replay script
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One step of a replay script
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Advance {
        #[serde(rename = "advanceMs")]
        advance_ms: u64,
    },
    Command(Command),
}

impl ScriptStep {
    fn label(&self) -> String {
        match self {
            ScriptStep::Advance { advance_ms } => format!("advance {} ms", advance_ms),
            ScriptStep::Command(command) => command.name().to_string(),
        }
    }
}

/// State observed after a step
#[derive(Debug, Clone)]
pub struct ReplayFrame {
    /// 1-based step number
    pub step: usize,
    pub label: String,
    pub elapsed: Duration,
    pub state: Arc<BusState>,
}

pub fn parse_script(content: &str) -> ScriptResult<Vec<ScriptStep>> {
    Ok(serde_json::from_str(content)?)
}

pub fn load_script(path: &Path) -> ScriptResult<Vec<ScriptStep>> {
    let content = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&content)
}

/// Run every step on a fresh virtual timeline
pub fn run_script(config: &NotificationConfig, steps: Vec<ScriptStep>) -> Vec<ReplayFrame> {
    let mut center = NotificationCenter::manual(config);
    let mut frames = Vec::with_capacity(steps.len());

    for (index, step) in steps.into_iter().enumerate() {
        let label = step.label();
        let state = match step {
            ScriptStep::Advance { advance_ms } => center.advance(Duration::from_millis(advance_ms)),
            ScriptStep::Command(command) => center.dispatch(command),
        };
        debug!("Replay step {} ({}) -> {} queued", index + 1, label, state.len());
        frames.push(ReplayFrame {
            step: index + 1,
            label,
            elapsed: center.elapsed(),
            state,
        });
    }

    frames
}

/// Human-readable rendering of both channels
pub fn render_frame(frame: &ReplayFrame) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[step {} | t={:.3}s] {}",
        frame.step,
        frame.elapsed.as_secs_f64(),
        frame.label
    );

    match selectors::banner(&frame.state) {
        Some(view) => {
            let _ = write!(
                out,
                "  banner: {} {:<7} {}  {}",
                view.current.notification_type().icon(),
                view.current.notification_type(),
                view.current.id(),
                view.current.message()
            );
            if view.pending > 0 {
                let _ = write!(out, "  (+{} queued)", view.pending);
            }
            out.push('\n');
        }
        None => out.push_str("  banner: -\n"),
    }

    let toasts = selectors::toasts(&frame.state);
    if toasts.is_empty() {
        out.push_str("  toasts: -\n");
    } else {
        out.push_str("  toasts:\n");
        for record in toasts {
            let _ = writeln!(
                out,
                "    {} {:<7} {}  {}",
                record.notification_type().icon(),
                record.notification_type(),
                record.id(),
                record.message()
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::Severity;

    const SCRIPT: &str = r#"[
        {"command": "raise", "message": "Saved", "status": 200, "displayType": "toast", "notificationType": "success"},
        {"command": "raise", "message": "Network error", "status": 503, "displayType": "banner"},
        {"advanceMs": 6000},
        {"command": "dismissById", "id": "n2"},
        {"command": "clearAll"}
    ]"#;

    #[test]
    fn test_parse_steps() {
        let steps = parse_script(SCRIPT).unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[2], ScriptStep::Advance { advance_ms: 6000 });
        assert_eq!(steps[4], ScriptStep::Command(Command::ClearAll));
    }

    #[test]
    fn test_run_script() {
        let frames = run_script(&NotificationConfig::default(), parse_script(SCRIPT).unwrap());
        assert_eq!(frames.len(), 5);

        let second = &frames[1];
        assert_eq!(selectors::toasts(&second.state).len(), 1);
        let banner = selectors::banner(&second.state).unwrap();
        assert_eq!(banner.current.id().as_str(), "n2");
        assert_eq!(banner.current.notification_type(), Severity::Error);

        let third = &frames[2];
        assert_eq!(third.elapsed, Duration::from_secs(6));
        assert!(!selectors::toast_visible(&third.state));

        assert!(frames[3].state.is_empty());
        assert!(frames[4].state.is_empty());
    }

    #[test]
    fn test_render_frame() {
        let frames = run_script(&NotificationConfig::default(), parse_script(SCRIPT).unwrap());
        let rendered = render_frame(&frames[1]);
        assert!(rendered.starts_with("[step 2 | t=0.000s] raise"));
        assert!(rendered.contains("Network error"));
        assert!(rendered.contains("Saved"));

        let rendered = render_frame(&frames[4]);
        assert!(rendered.contains("banner: -"));
        assert!(rendered.contains("toasts: -"));
    }

    #[test]
    fn test_invalid_script() {
        assert!(matches!(
            parse_script(r#"[{"command": "explode"}]"#),
            Err(ScriptError::Parse(_))
        ));
    }
}
