//! Diagnostic messages shared by every stage of the front end.

use std::fmt;

use crate::context::Context;
use crate::span::Location;

/// Severity level of a message.
///
/// Only `Error` and `InternalError` are fatal; see [`Severity::is_fatal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// An invariant of the front end itself was violated.
    InternalError,
}

impl Severity {
    pub fn is_fatal(self) -> bool {
        matches!(self, Severity::Error | Severity::InternalError)
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single located message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub location: Location,
    pub severity: Severity,
    pub text: String,
}

impl Message {
    pub fn new(location: Location, severity: Severity, text: impl Into<String>) -> Self {
        Message {
            location,
            severity,
            text: text.into(),
        }
    }

    /// Render the message with the offending source line underneath.
    ///
    /// The source line is clipped to the context's display width.
    pub fn render(&self, ctx: &Context) -> String {
        let source = ctx.content();
        let (line, col) = self.location.line_col(source);
        let mut output = format!(
            "{}:{}:{}: {}: {}",
            self.location.file, line, col, self.severity, self.text
        );

        let line_start = source[..self.location.start.min(source.len())]
            .rfind('\n')
            .map_or(0, |idx| idx + 1);
        let line_text = source[line_start..].lines().next().unwrap_or("");
        if line_text.is_empty() {
            return output;
        }

        let gutter = format!("{line:4} | ");
        let room = ctx.config().width.saturating_sub(gutter.len()).max(1);
        let shown: String = line_text.chars().take(room).collect();
        output.push('\n');
        output.push_str(&gutter);
        output.push_str(&shown);

        let lead = col - 1;
        if lead < room {
            let caret_len = self
                .location
                .length
                .clamp(1, room - lead)
                .min(shown.chars().count().saturating_sub(lead).max(1));
            output.push('\n');
            output.push_str(&" ".repeat(gutter.len() - 2));
            output.push_str("| ");
            output.push_str(&" ".repeat(lead));
            output.push_str(&"^".repeat(caret_len));
        }
        output
    }
}

/// Render a unit's messages, fitting them into the display height.
///
/// The first message is always shown in full. Once the next one would not
/// fit, the remainder is summarised on a single line.
pub fn render_all(messages: &[Message], ctx: &Context) -> String {
    let budget = ctx.config().height.saturating_sub(1);
    let mut lines: Vec<String> = Vec::new();
    for (shown, message) in messages.iter().enumerate() {
        let rendered = message.render(ctx);
        let needed = rendered.lines().count();
        if shown > 0 && lines.len() + needed > budget {
            lines.push(format!("... and {} more message(s)", messages.len() - shown));
            break;
        }
        lines.extend(rendered.lines().map(str::to_string));
    }
    lines.join("\n")
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.severity, self.text, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Config, Context};

    #[test]
    fn only_errors_are_fatal() {
        assert!(!Severity::Info.is_fatal());
        assert!(!Severity::Warning.is_fatal());
        assert!(Severity::Error.is_fatal());
        assert!(Severity::InternalError.is_fatal());
    }

    #[test]
    fn renders_location_and_caret() {
        let ctx = Context::new("a = 1\nb = $\n", "demo.tk");
        let message = Message::new(ctx.location(10, 1), Severity::Error, "Unexpected character");
        let rendered = message.render(&ctx);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "demo.tk:2:5: error: Unexpected character");
        assert_eq!(lines[1], "   2 | b = $");
        assert_eq!(lines[2], "     |     ^");
    }

    #[test]
    fn long_batches_are_cut_to_the_display_height() {
        let ctx = Context::new("a = (\nb = [\nc = {\n", "many.tk").with_config(Config {
            width: 80,
            height: 4,
        });
        let messages: Vec<Message> = [4, 10, 16]
            .into_iter()
            .map(|start| Message::new(ctx.location(start, 1), Severity::Error, "Unclosed bracket"))
            .collect();
        let rendered = render_all(&messages, &ctx);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "many.tk:1:5: error: Unclosed bracket");
        assert_eq!(lines[3], "... and 2 more message(s)");
    }

    #[test]
    fn short_batches_are_rendered_in_full() {
        let ctx = Context::new("x = $\n", "few.tk");
        let messages = vec![
            Message::new(ctx.location(4, 1), Severity::Warning, "first"),
            Message::new(ctx.location(0, 1), Severity::Info, "second"),
        ];
        let rendered = render_all(&messages, &ctx);
        assert_eq!(rendered.lines().count(), 6);
        assert!(!rendered.contains("more message"));
        assert!(render_all(&[], &ctx).is_empty());
    }

    #[test]
    fn renders_without_snippet_for_blank_lines() {
        let ctx = Context::new("\n", "blank.tk");
        let message = Message::new(ctx.location(0, 1), Severity::Warning, "odd");
        assert_eq!(message.render(&ctx), "blank.tk:1:1: warning: odd");
    }
}
