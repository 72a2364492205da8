//! Dependency ordering over the workflow body.
//!
//! Produces a total order per region such that every step appears after the
//! steps producing the values it reads, with ties among independent steps
//! broken by original declaration order. Declaration-order tie-breaking is
//! what makes re-compilation of the same graph byte-identical.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{CompileError, Warning};
use crate::graph::{Region, Step, ValueSource, WorkflowGraph};

/// Lifecycle of a task node between graph construction and emission.
///
/// All reachable nodes must end in `Emitted` before the workflow block
/// closes; a node still `Unvisited` while something depends on it is a
/// fatal unreachable-node error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Unvisited,
    Ordered,
    Emitted,
}

/// The ordered body plus the bookkeeping the emitter consumes.
#[derive(Debug, Clone)]
pub struct OrderedWorkflow {
    /// Deep copy of the body with every region topologically ordered
    pub body: Region,
    /// Called tasks in order of first reference; task definition blocks are
    /// emitted in this order
    pub task_order: Vec<String>,
    /// Non-fatal findings (unused task nodes)
    pub warnings: Vec<Warning>,
    states: IndexMap<String, NodeState>,
}

impl OrderedWorkflow {
    /// Current lifecycle state of a task node.
    pub fn state(&self, task: &str) -> NodeState {
        self.states.get(task).copied().unwrap_or_default()
    }

    /// Mark every ordered node as emitted; called once the document text is
    /// complete.
    pub fn mark_emitted(&mut self) {
        for state in self.states.values_mut() {
            if *state == NodeState::Ordered {
                *state = NodeState::Emitted;
            }
        }
    }

    /// Consume the bookkeeping, yielding the final state of every node.
    pub fn into_states(self) -> IndexMap<String, NodeState> {
        self.states
    }
}

/// Order the whole body and check reachability.
pub fn order_body(graph: &WorkflowGraph) -> Result<OrderedWorkflow, CompileError> {
    let body = order_region(graph, &graph.body)?;

    let mut task_order = Vec::new();
    collect_call_order(&body, &mut task_order);

    let mut states: IndexMap<String, NodeState> = graph
        .tasks
        .keys()
        .map(|id| (id.clone(), NodeState::Unvisited))
        .collect();
    for task in &task_order {
        states.insert(task.clone(), NodeState::Ordered);
    }

    // Every task whose output is read by the ordered body must itself have
    // been placed; a read of an unplaced task is a dangling dependency.
    let mut read_tasks = Vec::new();
    collect_read_tasks(graph, &body, &mut read_tasks);
    for task in &read_tasks {
        if states.get(task) == Some(&NodeState::Unvisited) {
            return Err(CompileError::UnreachableNode { node: task.clone() });
        }
    }

    let read_set: HashSet<&String> = read_tasks.iter().collect();
    let warnings = graph
        .tasks
        .keys()
        .filter(|id| states[*id] == NodeState::Unvisited && !read_set.contains(id))
        .map(|id| Warning::UnusedNode { node: id.clone() })
        .collect();

    Ok(OrderedWorkflow {
        body,
        task_order,
        warnings,
        states,
    })
}

fn order_region(graph: &WorkflowGraph, region: &Region) -> Result<Region, CompileError> {
    // Order nested regions first so each step's external reads are stable.
    let steps: Vec<Step> = region
        .steps
        .iter()
        .map(|step| order_step_children(graph, step))
        .collect::<Result<_, _>>()?;

    let defines: Vec<HashSet<String>> = steps.iter().map(|s| step_defines(s)).collect();
    let reads: Vec<HashSet<String>> = steps.iter().map(|s| step_reads(graph, s)).collect();

    let internal: HashSet<&String> = defines.iter().flatten().collect();

    let mut available: HashSet<String> = HashSet::new();
    let mut placed = vec![false; steps.len()];
    let mut ordered = Vec::with_capacity(steps.len());

    while ordered.len() < steps.len() {
        // First unplaced step whose internal reads are all satisfied wins;
        // scanning in declaration order is the determinism tie-breaker.
        let next = steps.iter().enumerate().position(|(i, _)| {
            !placed[i]
                && reads[i]
                    .iter()
                    .all(|r| !internal.contains(r) || available.contains(r))
        });
        match next {
            Some(i) => {
                placed[i] = true;
                available.extend(defines[i].iter().cloned());
                ordered.push(steps[i].clone());
            }
            None => {
                let nodes = steps
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !placed[*i])
                    .map(|(_, s)| s.diagnostic_id())
                    .collect();
                return Err(CompileError::CyclicDependency { nodes });
            }
        }
    }

    Ok(Region::new(ordered))
}

fn order_step_children(graph: &WorkflowGraph, step: &Step) -> Result<Step, CompileError> {
    match step {
        Step::Branch(branch) => {
            let mut ordered = branch.clone();
            for arm in &mut ordered.arms {
                arm.body = order_region(graph, &arm.body)?;
            }
            Ok(Step::Branch(ordered))
        }
        Step::Scatter {
            variable,
            source,
            body,
        } => Ok(Step::Scatter {
            variable: variable.clone(),
            source: source.clone(),
            body: order_region(graph, body)?,
        }),
        other => Ok(other.clone()),
    }
}

/// Symbols a step makes available to subsequent steps: the called task id,
/// the assigned variable, or everything its nested regions define.
fn step_defines(step: &Step) -> HashSet<String> {
    let mut out = HashSet::new();
    match step {
        Step::Call(task) => {
            out.insert(task.clone());
        }
        Step::Assign { name, .. } => {
            out.insert(name.clone());
        }
        Step::Branch(branch) => {
            for arm in &branch.arms {
                for s in &arm.body.steps {
                    out.extend(step_defines(s));
                }
            }
        }
        Step::Scatter { body, .. } => {
            for s in &body.steps {
                out.extend(step_defines(s));
            }
        }
    }
    out
}

/// Symbols a step needs before it can run, seen from its containing region:
/// reads satisfied inside a nested region do not leak out.
fn step_reads(graph: &WorkflowGraph, step: &Step) -> HashSet<String> {
    let mut out = HashSet::new();
    match step {
        Step::Call(task) => {
            for edge in graph.edges_into(task) {
                if let Some(symbol) = source_symbol(&edge.source) {
                    out.insert(symbol);
                }
            }
        }
        Step::Assign { source, .. } => {
            if let Some(symbol) = source_symbol(source) {
                out.insert(symbol);
            }
        }
        Step::Branch(branch) => {
            out.insert(branch.predicate.task.clone());
            // A variable assigned in one arm and read in a sibling arm is
            // internal to the branch, not a dependency of it.
            let defines = step_defines(step);
            for arm in &branch.arms {
                for read in region_external_reads(graph, &arm.body) {
                    if !defines.contains(&read) {
                        out.insert(read);
                    }
                }
            }
        }
        Step::Scatter {
            variable,
            source,
            body,
        } => {
            if let Some(symbol) = source_symbol(source) {
                out.insert(symbol);
            }
            let mut inner = region_external_reads(graph, body);
            inner.remove(variable);
            out.extend(inner);
        }
    }
    out
}

fn region_external_reads(graph: &WorkflowGraph, region: &Region) -> HashSet<String> {
    let mut reads = HashSet::new();
    let mut defines = HashSet::new();
    for step in &region.steps {
        reads.extend(step_reads(graph, step));
        defines.extend(step_defines(step));
    }
    reads.retain(|r| !defines.contains(r));
    reads
}

/// Workflow inputs are always in scope, so they induce no ordering edge.
fn source_symbol(source: &ValueSource) -> Option<String> {
    match source {
        ValueSource::TaskOutput { task, .. } => Some(task.clone()),
        ValueSource::Variable { name } => Some(name.clone()),
        ValueSource::WorkflowInput { .. } => None,
    }
}

fn collect_call_order(region: &Region, out: &mut Vec<String>) {
    for step in &region.steps {
        match step {
            Step::Call(task) => {
                if !out.contains(task) {
                    out.push(task.clone());
                }
            }
            Step::Assign { .. } => {}
            Step::Branch(branch) => {
                for arm in &branch.arms {
                    collect_call_order(&arm.body, out);
                }
            }
            Step::Scatter { body, .. } => collect_call_order(body, out),
        }
    }
}

/// Every task id read anywhere in the body, in first-encounter order.
fn collect_read_tasks(graph: &WorkflowGraph, region: &Region, out: &mut Vec<String>) {
    for step in &region.steps {
        match step {
            Step::Call(task) => {
                for edge in graph.edges_into(task) {
                    if let ValueSource::TaskOutput { task: src, .. } = &edge.source {
                        push_unique(out, src);
                    }
                }
            }
            Step::Assign { source, .. } => {
                if let ValueSource::TaskOutput { task: src, .. } = source {
                    push_unique(out, src);
                }
            }
            Step::Branch(branch) => {
                push_unique(out, &branch.predicate.task);
                for arm in &branch.arms {
                    collect_read_tasks(graph, &arm.body, out);
                }
            }
            Step::Scatter { source, body, .. } => {
                if let ValueSource::TaskOutput { task: src, .. } = source {
                    push_unique(out, src);
                }
                collect_read_tasks(graph, body, out);
            }
        }
    }
}

fn push_unique(out: &mut Vec<String>, task: &str) {
    if !out.iter().any(|t| t == task) {
        out.push(task.to_string());
    }
}
