//! Build event reports carried in [`Response::report`](crate::Response::report).

use serde::{Deserialize, Serialize};

/// Importance of a build message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Failure output.
    Error,
    /// Something worth attention.
    Warn,
    /// Normal build output.
    #[default]
    Info,
    /// Detailed output.
    Verbose,
    /// Diagnostic output.
    Debug,
}

/// One event fired by the build project while a command ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildEvent {
    /// A build of `project` began.
    BuildStarted {
        /// Project name.
        project: String,
    },
    /// A build of `project` ended, with the failure if there was one.
    BuildFinished {
        /// Project name.
        project: String,
        /// Failure text.
        #[serde(default)]
        error: Option<String>,
    },
    /// A target began.
    TargetStarted {
        /// Target name.
        target: String,
    },
    /// A target ended, with the failure if there was one.
    TargetFinished {
        /// Target name.
        target: String,
        /// Failure text.
        #[serde(default)]
        error: Option<String>,
    },
    /// A line of build output.
    Message {
        /// Target that logged the line, if any.
        #[serde(default)]
        target: Option<String>,
        /// Importance of the line.
        #[serde(default)]
        priority: Priority,
        /// Message text.
        text: String,
    },
}

/// Ordered log of the events one command triggered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Events in the order they fired.
    pub events: Vec<BuildEvent>,
}

impl BuildReport {
    /// Wraps an event log.
    #[must_use]
    pub const fn new(events: Vec<BuildEvent>) -> Self {
        Self { events }
    }

    /// Encodes the report as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a report; an empty string is an empty report.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is neither empty nor a valid report.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text)
    }

    /// Names of the targets that started, in order.
    pub fn started_targets(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            BuildEvent::TargetStarted { target } => Some(target.as_str()),
            _ => None,
        })
    }

    /// Message texts, in order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            BuildEvent::Message { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Returns true when no events were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
