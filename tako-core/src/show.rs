//! Human readable dumps of intermediate results.
//!
//! Used by the driver when a run stops early and by debug logging. Nothing
//! here feeds back into parsing.

use std::fmt;

use crate::ast::Tree;
use crate::context::Context;
use crate::lexer::Token;
use crate::parser::{Argument, Definition, Module, Symbols, Value};

/// One token per line: kind, span and text.
pub fn show_tokens(tokens: &[Token], ctx: &Context) -> String {
    tokens
        .iter()
        .map(|token| {
            format!(
                "{:?} {}+{} {:?}",
                token.kind,
                token.location.start,
                token.location.length,
                ctx.text(&token.location)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indented outline of a token tree, one node per line.
pub fn show_tree(tree: &Tree<Token>, ctx: &Context) -> String {
    let mut output = String::new();
    write_tree(tree, ctx, 0, &mut output);
    output
}

fn write_tree(tree: &Tree<Token>, ctx: &Context, depth: usize, output: &mut String) {
    if !output.is_empty() {
        output.push('\n');
    }
    output.push_str(&"  ".repeat(depth));
    output.push_str(&format!("{:?} {}", tree.value.kind, ctx.text(&tree.value.location)));
    for child in &tree.children {
        write_tree(child, ctx, depth + 1, output);
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        write_args(f, &self.args)?;
        f.write_str(")")
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            write_args(f, &self.args)?;
            f.write_str(")")?;
        }
        if let Some(value) = &self.value {
            write!(f, " = {value}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for definition in &self.definitions {
            writeln!(f, "  {definition}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Symbols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (path, definition) in self.iter() {
            writeln!(f, "{}: {}", path.join("/"), definition)?;
        }
        Ok(())
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Argument]) -> fmt::Result {
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}
