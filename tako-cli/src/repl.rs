//! Interactive loop.
//!
//! Each line is compiled together with every line accepted before it. A line
//! is only accepted into the buffer when its run produced no messages at all.

use std::io::{BufRead, Write};

use anyhow::{Context as _, Result};
use tako_core::{Config, Context, PassStep, compile_interactive, render_all};
use tracing::debug;

const QUIT: &str = ":q";

pub fn banner() {
    eprintln!("tako - version {}", env!("CARGO_PKG_VERSION"));
    eprintln!("An experimental compiler for ergonomic software verification");
}

pub fn run(
    input: impl BufRead,
    out: &mut impl Write,
    last_step: PassStep,
    config: Config,
) -> Result<()> {
    let mut content = String::new();
    let mut lines = input.lines();

    loop {
        eprint!("> ");
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;
        if line.trim() == QUIT {
            break;
        }

        let candidate = format!("{content}\n{line}");
        let ctx = Context::new(candidate.clone(), "stdin")
            .with_last_step(last_step)
            .with_config(config);

        match compile_interactive(ctx) {
            Ok(mut compilation) => {
                let messages = compilation.context.ctx_mut().finish();
                if !messages.is_empty() {
                    eprintln!("{}", render_all(&messages, compilation.context.ctx()));
                } else {
                    content = candidate;
                    debug!(bytes = content.len(), "accepted line");
                }
                if let Some(module) = &compilation.module {
                    write!(out, "{module}").context("failed to write module")?;
                    out.flush().context("failed to flush output")?;
                }
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    eprintln!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(input: &str) -> String {
        let mut out = Vec::new();
        run(input.as_bytes(), &mut out, PassStep::Final, Config::default()).expect("repl");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn accumulates_accepted_lines() {
        let out = session("a = 1\nb = a\n:q\nc = 3\n");
        let last = out.rsplit("module stdin").next().unwrap();
        assert!(last.contains("a = 1"));
        assert!(last.contains("b = a"));
        assert!(!out.contains("c = 3"));
    }

    #[test]
    fn rejected_lines_are_not_kept() {
        let out = session("a = 1\nb = (\nc = 2\n");
        let last = out.rsplit("module stdin").next().unwrap();
        assert!(last.contains("a = 1"));
        assert!(last.contains("c = 2"));
        assert!(!last.contains("b ="));
    }

    #[test]
    fn later_lines_replace_definitions() {
        let out = session("x = 1\nx = 2\n");
        let last = out.rsplit("module stdin").next().unwrap();
        assert!(last.contains("x = 2"));
        assert!(!last.contains("x = 1"));
    }
}
