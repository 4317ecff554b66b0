//! Per-compilation state threaded through the pipeline.
//!
//! A [`Context`] owns the source text of one compilation unit together
//! with the message log every stage writes into. Stages consult
//! [`Context::done`] before doing work and [`Context::start_step`] to honour
//! the configured stop threshold.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::diagnostic::{Message, Severity};
use crate::error::CoreError;
use crate::span::{Location, Offset};

/// Ordered pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PassStep {
    Init,
    Lex,
    Parse,
    Check,
    Final,
}

impl PassStep {
    pub const ALL: [PassStep; 5] = [
        PassStep::Init,
        PassStep::Lex,
        PassStep::Parse,
        PassStep::Check,
        PassStep::Final,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PassStep::Init => "Init",
            PassStep::Lex => "Lex",
            PassStep::Parse => "Parse",
            PassStep::Check => "Check",
            PassStep::Final => "Final",
        }
    }
}

impl fmt::Display for PassStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PassStep {
    type Err = CoreError;

    /// Case-insensitive lookup by stage name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PassStep::ALL
            .into_iter()
            .find(|step| step.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownPassStep(s.to_string()))
    }
}

/// Display configuration. Only used when rendering messages: `width` clips
/// source snippets and `height` caps how many lines a batch of messages may
/// take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub width: usize,
    pub height: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            width: 80,
            height: 24,
        }
    }
}

/// State for a single compilation unit (a file or a REPL buffer).
#[derive(Debug)]
pub struct Context {
    messages: Vec<Message>,
    content: String,
    filename: Arc<str>,
    step: PassStep,
    last_step: PassStep,
    config: Config,
}

impl Context {
    pub fn new(content: impl Into<String>, filename: &str) -> Self {
        Context {
            messages: Vec::new(),
            content: content.into(),
            filename: Arc::from(filename),
            step: PassStep::Init,
            last_step: PassStep::Final,
            config: Config::default(),
        }
    }

    pub fn with_last_step(mut self, last_step: PassStep) -> Self {
        self.last_step = last_step;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn filename(&self) -> &Arc<str> {
        &self.filename
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn step(&self) -> PassStep {
        self.step
    }

    /// Build a location in this unit's file.
    pub fn location(&self, start: Offset, length: Offset) -> Location {
        Location::new(start, length, self.filename.clone())
    }

    /// Source text covered by `location`, or `""` if it is out of bounds.
    pub fn text(&self, location: &Location) -> &str {
        location.text(&self.content).unwrap_or("")
    }

    /// Append a message to the log.
    pub fn msg(&mut self, location: Location, severity: Severity, text: impl Into<String>) {
        let message = Message::new(location, severity, text);
        if severity.is_fatal() {
            debug!(step = %self.step, message = %message, "fatal message");
        } else {
            trace!(step = %self.step, message = %message, "message");
        }
        self.messages.push(message);
    }

    /// True once the log holds an `Error` or `InternalError`.
    pub fn done(&self) -> bool {
        self.messages.iter().any(|m| m.severity.is_fatal())
    }

    /// Record entry into `step`.
    ///
    /// Returns false when `step` lies beyond the configured last step; the
    /// caller must then skip its work and return empty output.
    pub fn start_step(&mut self, step: PassStep) -> bool {
        self.step = step;
        if step > self.last_step {
            trace!(%step, last_step = %self.last_step, "skipping step");
            return false;
        }
        debug!(%step, file = %self.filename, "starting step");
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drain the log, returning the messages in emission order.
    pub fn finish(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }
}
