//! Pre-emission validation of the workflow graph.
//!
//! Everything here is checked before a single byte of WDL is produced:
//! identifier legality and uniqueness, branch arm structure, data-edge
//! endpoint existence and type compatibility, and input-port binding
//! (exactly one producer per consumed input). The emitter trusts a graph
//! that survived this pass.

use std::collections::HashSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CompileError;
use crate::graph::{
    BranchCondition, BranchNode, Region, Step, TaskNode, ValueSource, WorkflowGraph,
};
use crate::types::Type;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern"));

/// WDL reserved words that may not be used as task, port, input, or variable
/// names.
const RESERVED: &[&str] = &[
    "Array", "Boolean", "File", "Float", "Int", "Map", "None", "Object", "Pair", "String", "as",
    "call", "command", "else", "false", "if", "import", "input", "left", "meta", "object",
    "output", "parameter_meta", "right", "runtime", "scatter", "task", "then", "true", "version",
    "workflow",
];

/// Run the full validation pass.
pub fn validate(graph: &WorkflowGraph) -> Result<(), CompileError> {
    check_identifiers(graph)?;
    let called = collect_calls(graph)?;
    let variables = collect_variables(graph)?;
    check_branches(graph, &graph.body, &variables)?;
    check_edges(graph, &variables)?;
    check_input_defaults(graph)?;
    check_bindings(graph, &called)?;
    Ok(())
}

/// Resolve the type a value source produces, if the source exists.
pub(crate) fn resolve_source_type(
    graph: &WorkflowGraph,
    variables: &IndexMap<String, Type>,
    source: &ValueSource,
) -> Result<Type, CompileError> {
    match source {
        ValueSource::TaskOutput { task, output } => {
            let node = graph.task(task).ok_or_else(|| CompileError::NoSuchPort {
                task: task.clone(),
                port: output.clone(),
            })?;
            let port = node.output(output).ok_or_else(|| CompileError::NoSuchPort {
                task: task.clone(),
                port: output.clone(),
            })?;
            Ok(port.ty.clone())
        }
        ValueSource::WorkflowInput { name } => graph
            .workflow_input(name)
            .map(|i| i.ty.clone())
            .ok_or_else(|| CompileError::NoSuchInput { name: name.clone() }),
        ValueSource::Variable { name } => variables
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::NoSuchInput { name: name.clone() }),
    }
}

fn check_identifier(name: &str, context: &str) -> Result<(), CompileError> {
    if !IDENTIFIER.is_match(name) {
        return Err(CompileError::illegal(name, context));
    }
    if RESERVED.contains(&name) {
        return Err(CompileError::illegal(name, format!("{} (reserved word)", context)));
    }
    Ok(())
}

fn check_identifiers(graph: &WorkflowGraph) -> Result<(), CompileError> {
    check_identifier(&graph.name, "workflow name")?;

    for task in graph.tasks.values() {
        check_identifier(&task.id, "task id")?;
        check_task_ports(task)?;
    }

    let mut input_names = HashSet::new();
    for input in &graph.inputs {
        check_identifier(&input.name, "workflow input")?;
        if !input_names.insert(input.name.as_str()) {
            return Err(CompileError::duplicate(&input.name, "workflow input"));
        }
        if graph.tasks.contains_key(&input.name) {
            return Err(CompileError::duplicate(&input.name, "workflow input vs task id"));
        }
    }
    Ok(())
}

fn check_task_ports(task: &TaskNode) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for port in task.inputs.iter().chain(task.outputs.iter()) {
        check_identifier(&port.name, &format!("port of task {}", task.id))?;
        if !seen.insert(port.name.as_str()) {
            return Err(CompileError::duplicate(
                format!("{}.{}", task.id, port.name),
                "port name within task",
            ));
        }
    }
    Ok(())
}

/// Collect every task called anywhere in the body, rejecting calls to
/// unknown tasks and second calls to the same task (no aliasing support, so
/// a second call would collide in the output namespace).
fn collect_calls(graph: &WorkflowGraph) -> Result<Vec<String>, CompileError> {
    let mut called = Vec::new();
    collect_calls_region(graph, &graph.body, &mut called)?;
    Ok(called)
}

fn collect_calls_region(
    graph: &WorkflowGraph,
    region: &Region,
    called: &mut Vec<String>,
) -> Result<(), CompileError> {
    for step in &region.steps {
        match step {
            Step::Call(task) => {
                if graph.task(task).is_none() {
                    return Err(CompileError::NoSuchTask { name: task.clone() });
                }
                if called.iter().any(|c| c == task) {
                    return Err(CompileError::duplicate(task, "task called more than once"));
                }
                called.push(task.clone());
            }
            Step::Assign { .. } => {}
            Step::Branch(branch) => {
                for arm in &branch.arms {
                    collect_calls_region(graph, &arm.body, called)?;
                }
            }
            Step::Scatter { body, .. } => collect_calls_region(graph, body, called)?,
        }
    }
    Ok(())
}

/// Collect workflow-scope variables (merge assignments and scatter
/// variables) with their types, checking legality and namespace collisions
/// as they are discovered. The same merge variable may be assigned in
/// several branch arms; two assignments within one region are rejected
/// (single assignment).
fn collect_variables(graph: &WorkflowGraph) -> Result<IndexMap<String, Type>, CompileError> {
    let mut variables = IndexMap::new();
    collect_variables_region(graph, &graph.body, &mut variables)?;
    Ok(variables)
}

fn collect_variables_region(
    graph: &WorkflowGraph,
    region: &Region,
    variables: &mut IndexMap<String, Type>,
) -> Result<(), CompileError> {
    let mut assigned_here = HashSet::new();
    for step in &region.steps {
        match step {
            Step::Call(_) => {}
            Step::Assign { name, ty, .. } => {
                check_identifier(name, "scope variable")?;
                if !assigned_here.insert(name.clone()) {
                    return Err(CompileError::duplicate(name, "assigned twice in one region"));
                }
                check_variable_namespace(graph, name)?;
                variables.entry(name.clone()).or_insert_with(|| ty.clone());
            }
            Step::Branch(branch) => {
                for arm in &branch.arms {
                    collect_variables_region(graph, &arm.body, variables)?;
                }
            }
            Step::Scatter {
                variable,
                source,
                body,
            } => {
                check_identifier(variable, "scatter variable")?;
                check_variable_namespace(graph, variable)?;
                if variables.contains_key(variable) {
                    return Err(CompileError::duplicate(variable, "scatter variable"));
                }
                let source_ty = resolve_source_type(graph, variables, source)?;
                let item_ty = source_ty.item_type().ok_or_else(|| {
                    CompileError::type_conflict(
                        format!("scatter-{}", variable),
                        "Array",
                        &source_ty,
                    )
                })?;
                variables.insert(variable.clone(), item_ty.clone());
                collect_variables_region(graph, body, variables)?;
            }
        }
    }
    Ok(())
}

fn check_variable_namespace(graph: &WorkflowGraph, name: &str) -> Result<(), CompileError> {
    if graph.tasks.contains_key(name) {
        return Err(CompileError::duplicate(name, "variable vs task id"));
    }
    if graph.workflow_input(name).is_some() {
        return Err(CompileError::duplicate(name, "variable vs workflow input"));
    }
    Ok(())
}

/// Structural and type checks on branch nodes: a branch needs at least one
/// arm, a Default arm may appear at most once and only last, the predicate
/// port must exist, and every Equals literal must be comparable with it.
fn check_branches(
    graph: &WorkflowGraph,
    region: &Region,
    variables: &IndexMap<String, Type>,
) -> Result<(), CompileError> {
    for step in &region.steps {
        match step {
            Step::Branch(branch) => {
                check_branch_node(graph, branch)?;
                for arm in &branch.arms {
                    check_branches(graph, &arm.body, variables)?;
                }
            }
            Step::Scatter { body, .. } => check_branches(graph, body, variables)?,
            _ => {}
        }
    }
    Ok(())
}

fn check_branch_node(graph: &WorkflowGraph, branch: &BranchNode) -> Result<(), CompileError> {
    let id = branch.diagnostic_id();
    if branch.arms.is_empty() {
        return Err(CompileError::malformed_branch(&id, "branch has no arms"));
    }

    let missing_port = || CompileError::NoSuchPort {
        task: branch.predicate.task.clone(),
        port: branch.predicate.port.clone(),
    };
    let predicate_ty = graph
        .task(&branch.predicate.task)
        .ok_or_else(missing_port)?
        .output(&branch.predicate.port)
        .ok_or_else(missing_port)?
        .ty
        .clone();

    for (i, arm) in branch.arms.iter().enumerate() {
        match &arm.condition {
            BranchCondition::Equals(literal) => {
                if !literal.coerces_to(&predicate_ty) {
                    return Err(CompileError::type_conflict(
                        format!("{} condition {}", id, i),
                        &predicate_ty,
                        literal,
                    ));
                }
            }
            BranchCondition::Default => {
                if i + 1 != branch.arms.len() {
                    return Err(CompileError::malformed_branch(
                        &id,
                        "default arm must be last",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Check every data edge and assignment for endpoint existence and type
/// compatibility.
fn check_edges(
    graph: &WorkflowGraph,
    variables: &IndexMap<String, Type>,
) -> Result<(), CompileError> {
    for edge in &graph.edges {
        let dest_task = graph
            .task(&edge.dest.task)
            .ok_or_else(|| CompileError::NoSuchPort {
                task: edge.dest.task.clone(),
                port: edge.dest.port.clone(),
            })?;
        let dest_port = dest_task
            .input(&edge.dest.port)
            .ok_or_else(|| CompileError::NoSuchPort {
                task: edge.dest.task.clone(),
                port: edge.dest.port.clone(),
            })?;
        let source_ty = resolve_source_type(graph, variables, &edge.source)?;
        if !source_ty.coerces(&dest_port.ty) {
            return Err(CompileError::type_conflict(
                edge.dest.to_string(),
                &dest_port.ty,
                &source_ty,
            ));
        }
    }
    check_assignment_types(graph, &graph.body, variables)
}

fn check_assignment_types(
    graph: &WorkflowGraph,
    region: &Region,
    variables: &IndexMap<String, Type>,
) -> Result<(), CompileError> {
    for step in &region.steps {
        match step {
            Step::Assign { name, ty, source } => {
                let source_ty = resolve_source_type(graph, variables, source)?;
                if !source_ty.coerces(ty) {
                    return Err(CompileError::type_conflict(name, ty, &source_ty));
                }
            }
            Step::Branch(branch) => {
                for arm in &branch.arms {
                    check_assignment_types(graph, &arm.body, variables)?;
                }
            }
            Step::Scatter { body, .. } => check_assignment_types(graph, body, variables)?,
            _ => {}
        }
    }
    Ok(())
}

fn check_input_defaults(graph: &WorkflowGraph) -> Result<(), CompileError> {
    for input in &graph.inputs {
        if let Some(default) = &input.default {
            if !default.coerces_to(&input.ty) {
                return Err(CompileError::type_conflict(&input.name, &input.ty, default));
            }
        }
    }
    Ok(())
}

/// Every input port of a called task must have exactly one producer.
fn check_bindings(graph: &WorkflowGraph, called: &[String]) -> Result<(), CompileError> {
    for task_id in called {
        let task = graph.task(task_id).expect("calls already resolved");
        for port in &task.inputs {
            let mut producers = graph
                .edges
                .iter()
                .filter(|e| e.dest.task == *task_id && e.dest.port == port.name);
            match (producers.next(), producers.next()) {
                (None, _) => {
                    return Err(CompileError::unbound_input(task_id, &port.name));
                }
                (Some(_), Some(_)) => {
                    return Err(CompileError::MultipleBindings {
                        task: task_id.clone(),
                        input: port.name.clone(),
                    });
                }
                (Some(_), None) => {}
            }
        }
    }
    Ok(())
}
