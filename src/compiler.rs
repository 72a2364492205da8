//! Staged compilation pipeline.
//!
//! Compilation is a fixed sequence of pure passes with explicit data
//! handoff: validate the graph, order the body, resolve the workflow scope,
//! emit text. There is no shared mutable state between passes and no
//! internal concurrency; traversal order is a correctness property, not a
//! performance one. Independent compilations may run in parallel.

use indexmap::IndexMap;

use crate::emit::Emitter;
use crate::error::{CompileError, Warning};
use crate::graph::{validation, WorkflowGraph};
use crate::order::{order_body, NodeState};
use crate::scope::resolve_scope;

/// Result of a successful compilation: the complete document plus any
/// non-fatal findings.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub wdl: String,
    pub warnings: Vec<Warning>,
    /// Final lifecycle state of every task node, keyed by id. Every emitted
    /// node ends `Emitted`; unused nodes stay `Unvisited`.
    pub node_states: IndexMap<String, NodeState>,
}

/// Compile a workflow graph to WDL source.
///
/// All-or-nothing: any fatal error aborts before emission starts, so a
/// caller never sees a truncated document. A malformed graph fails the same
/// way on every run.
pub fn compile(graph: &WorkflowGraph) -> Result<CompileOutput, CompileError> {
    validation::validate(graph)?;
    let mut ordered = order_body(graph)?;
    let scope = resolve_scope(graph, &ordered.body)?;
    let wdl = Emitter::new().emit_document(graph, &ordered, &scope);
    ordered.mark_emitted();
    let warnings = std::mem::take(&mut ordered.warnings);
    Ok(CompileOutput {
        wdl,
        warnings,
        node_states: ordered.into_states(),
    })
}
