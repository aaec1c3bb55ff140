//! Event stream written by the rendered script, one JSON object per line

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::routes::RouteTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// In-page `console.*` output
    Console { text: String },

    RequestFailed { url: String, failure: String },

    RequestFinished { url: String, status: Option<u16> },

    /// A soft wait gave up; the run continues
    SoftTimeout { selector: String, notice: String },

    Step { index: usize, name: String },

    Passed { screenshot: PathBuf },

    Failed { error: String, screenshot: PathBuf },

    /// The browser was closed
    Closed,
}

/// A line from the script's stdout
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptLine {
    Event(ScriptEvent),
    /// Anything that isn't an event, passed through to the log
    Raw(String),
}

impl ScriptLine {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.starts_with('{') {
            if let Ok(event) = serde_json::from_str(trimmed) {
                return ScriptLine::Event(event);
            }
        }
        ScriptLine::Raw(line.to_string())
    }
}

/// Everything observed over one script run
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<ScriptEvent>,
    pub soft_timeouts: usize,
    pub requests_finished: usize,
    pub requests_failed: usize,
    pub closed: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and report one line. Never fails: malformed output is only
    /// logged.
    pub fn observe(&mut self, line: &str, routes: &RouteTable) {
        match ScriptLine::parse(line) {
            ScriptLine::Raw(raw) => {
                if !raw.trim().is_empty() {
                    debug!("[script] {}", raw);
                }
            }
            ScriptLine::Event(event) => {
                self.report(&event, routes);
                match &event {
                    ScriptEvent::SoftTimeout { .. } => self.soft_timeouts += 1,
                    ScriptEvent::RequestFinished { .. } => self.requests_finished += 1,
                    ScriptEvent::RequestFailed { .. } => self.requests_failed += 1,
                    ScriptEvent::Closed => self.closed += 1,
                    _ => {}
                }
                self.events.push(event);
            }
        }
    }

    fn report(&self, event: &ScriptEvent, routes: &RouteTable) {
        match event {
            ScriptEvent::Console { text } => info!("Browser console: {}", text),
            ScriptEvent::RequestFailed { url, failure } => {
                info!("Request failed: {} - {}", url, failure)
            }
            ScriptEvent::RequestFinished { url, status } => {
                let status = status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
                match routes.resolve(url) {
                    Some(route) => info!(mocked = %route.name, "Request finished: {} - {}", url, status),
                    None => info!("Request finished: {} - {}", url, status),
                }
            }
            ScriptEvent::SoftTimeout { selector, notice } => {
                warn!(%selector, "{}", notice)
            }
            ScriptEvent::Step { index, name } => debug!("Step {}: {}", index + 1, name),
            ScriptEvent::Passed { screenshot } => {
                debug!("Script reported success, screenshot {}", screenshot.display())
            }
            ScriptEvent::Failed { error, screenshot } => {
                debug!("Script reported failure ({}), screenshot {}", error, screenshot.display())
            }
            ScriptEvent::Closed => debug!("Browser closed"),
        }
    }

    /// The terminal `passed`/`failed` event, if the script got that far
    pub fn outcome(&self) -> Option<&ScriptEvent> {
        self.events
            .iter()
            .rev()
            .find(|e| matches!(e, ScriptEvent::Passed { .. } | ScriptEvent::Failed { .. }))
    }

    pub fn steps_started(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ScriptEvent::Step { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureSet;

    #[test]
    fn test_parse_event_lines() {
        assert_eq!(
            ScriptLine::parse(r#"{"event":"console","text":"hello"}"#),
            ScriptLine::Event(ScriptEvent::Console { text: "hello".to_string() })
        );
        assert_eq!(
            ScriptLine::parse(r#"{"event":"request_finished","url":"http://x/","status":null}"#),
            ScriptLine::Event(ScriptEvent::RequestFinished {
                url: "http://x/".to_string(),
                status: None
            })
        );
        assert_eq!(ScriptLine::parse(r#"{"event":"closed"}"#), ScriptLine::Event(ScriptEvent::Closed));
    }

    #[test]
    fn test_unknown_and_plain_lines_are_raw() {
        assert!(matches!(ScriptLine::parse("(node:1) Warning: something"), ScriptLine::Raw(_)));
        assert!(matches!(ScriptLine::parse(r#"{"event":"mystery"}"#), ScriptLine::Raw(_)));
        assert!(matches!(ScriptLine::parse("{broken"), ScriptLine::Raw(_)));
    }

    #[test]
    fn test_event_log_counts() {
        let routes = RouteTable::chat(&FixtureSet::chat()).unwrap();
        let mut log = EventLog::new();

        for line in [
            r#"{"event":"step","index":0,"name":"navigate:/"}"#,
            r#"{"event":"request_finished","url":"http://localhost:5173/api/v1/users/online","status":200}"#,
            r#"{"event":"request_failed","url":"http://localhost:5173/x.js","failure":"net::ERR_ABORTED"}"#,
            r#"{"event":"soft_timeout","selector":"text=Me","notice":"late"}"#,
            "not json",
            r#"{"event":"failed","error":"boom","screenshot":"verification/error.png"}"#,
            r#"{"event":"closed"}"#,
        ] {
            log.observe(line, &routes);
        }

        assert_eq!(log.events.len(), 6);
        assert_eq!(log.steps_started(), 1);
        assert_eq!(log.soft_timeouts, 1);
        assert_eq!(log.requests_finished, 1);
        assert_eq!(log.requests_failed, 1);
        assert_eq!(log.closed, 1);
        assert!(matches!(log.outcome(), Some(ScriptEvent::Failed { .. })));
    }
}
