//! Core front end of the tako compiler.
//!
//! The pipeline is:
//!
//!   source text
//!     -> lexer     (tokens partitioning the whole text)
//!     -> ast       (generic `Tree<Token>`: brackets, calls, operators)
//!     -> parser    (typed `Value` / `Definition` / `Module`)
//!
//! Every stage reads the source through a [`Context`] and writes its
//! findings into the context's message log. A fatal message blocks the
//! stages after it. The semantic checker and evaluator consume the
//! extracted [`Module`] and live outside this crate.

// ---------------------------------------------------------------------
// Diagnostics and per-compilation state
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod context;
pub mod error;

// ---------------------------------------------------------------------
// Front-end stages
// ---------------------------------------------------------------------

pub mod lexer;
pub mod ast;
pub mod parser;

// ---------------------------------------------------------------------
// Orchestration and dumps
// ---------------------------------------------------------------------

pub mod compiler;
pub mod show;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{Compilation, compile, compile_interactive};
pub use context::{Config, Context, PassStep};
pub use diagnostic::{Message, Severity, render_all};
pub use error::CoreError;
pub use parser::{Argument, Definition, Module, ParserContext, Value};
