//! Front-end pipeline orchestration.
//!
//! Runs lexing, tree building and extraction for one compilation unit,
//! stopping after the first stage that leaves a fatal message in the log.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::ast::{Tree, ast_module};
use crate::context::Context;
use crate::error::CoreError;
use crate::lexer::{Token, lex};
use crate::parser::{Module, ParserContext, parse_module};
use crate::show::{show_tokens, show_tree};

/// Outcome of running the front end over one unit.
///
/// `module` is only present when extraction finished without a fatal
/// message; the messages themselves stay in `context` until drained.
#[derive(Debug)]
pub struct Compilation {
    pub context: ParserContext,
    pub module: Option<Module>,
}

/// Run the front end over a file.
pub fn compile(ctx: Context) -> Result<Compilation, CoreError> {
    guarded(move || front_end(ctx, false))
}

/// Run the front end over a REPL buffer, where later definitions replace
/// earlier ones.
pub fn compile_interactive(ctx: Context) -> Result<Compilation, CoreError> {
    guarded(move || front_end(ctx, true))
}

/// Lex and build the top-level trees, or nothing if a stage blocked.
pub fn get_tree(ctx: &mut Context) -> Vec<Tree<Token>> {
    if ctx.done() {
        return Vec::new();
    }

    let tokens = lex(ctx);
    if ctx.done() {
        debug!(
            step = %ctx.step(),
            tokens = tokens.len(),
            "lexing blocked:\n{}",
            show_tokens(&tokens, ctx)
        );
        return Vec::new();
    }

    let forest = ast_module(&tokens, ctx);
    if ctx.done() {
        debug!(step = %ctx.step(), "tree building blocked");
        return Vec::new();
    }
    for tree in &forest {
        debug!("tree:\n{}", show_tree(tree, ctx));
    }
    forest
}

fn front_end(mut ctx: Context, allow_overrides: bool) -> Compilation {
    let forest = get_tree(&mut ctx);

    let mut p_ctx = ParserContext::new(ctx);
    p_ctx.allow_overrides = allow_overrides;
    if p_ctx.done() {
        return Compilation {
            context: p_ctx,
            module: None,
        };
    }

    let module = parse_module(&forest, &mut p_ctx);
    if p_ctx.done() {
        debug!("extraction blocked, symbols so far:\n{}", p_ctx.symbols);
        return Compilation {
            context: p_ctx,
            module: None,
        };
    }

    Compilation {
        context: p_ctx,
        module,
    }
}

/// Turn a panic inside the front end into [`CoreError::Crashed`].
fn guarded(run: impl FnOnce() -> Compilation) -> Result<Compilation, CoreError> {
    panic::catch_unwind(AssertUnwindSafe(run)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|reason| reason.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(%reason, "front end crashed");
        CoreError::Crashed(reason)
    })
}
