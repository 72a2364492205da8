//! In-memory workflow graph consumed by the compiler.
//!
//! The graph is handed over fully built by an external graph builder: task
//! nodes with typed ports, data edges between ports, workflow-level inputs,
//! and a body describing the call layout. Conditional structure is a tree of
//! regions overlaid on the dependency DAG: a sequential region is a list of
//! steps, a branch step holds ordered mutually exclusive arms, each with its
//! own sub-region. The compiler reads the graph; it never mutates it.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::Type;
use crate::value::Literal;

pub mod validation;

#[cfg(test)]
mod graph_tests;

/// A typed, named value slot on a task node.
///
/// Ports are uniquely identified by `(owner task id, name)` and are immutable
/// once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub ty: Type,
}

impl Port {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Reference to a named port on a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub task: String,
    pub port: String,
}

impl PortRef {
    pub fn new(task: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.task, self.port)
    }
}

/// The producing side of a data flow: where a consumed value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSource {
    /// An output port of another task
    TaskOutput { task: String, output: String },
    /// A workflow-level input parameter
    WorkflowInput { name: String },
    /// A workflow-scope variable (merge variable or scatter variable)
    Variable { name: String },
}

impl ValueSource {
    pub fn task_output(task: impl Into<String>, output: impl Into<String>) -> Self {
        ValueSource::TaskOutput {
            task: task.into(),
            output: output.into(),
        }
    }

    pub fn workflow_input(name: impl Into<String>) -> Self {
        ValueSource::WorkflowInput { name: name.into() }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        ValueSource::Variable { name: name.into() }
    }

    /// Render this source as the WDL expression that reads it.
    pub fn wdl_ref(&self) -> String {
        match self {
            ValueSource::TaskOutput { task, output } => format!("{}.{}", task, output),
            ValueSource::WorkflowInput { name } | ValueSource::Variable { name } => name.clone(),
        }
    }
}

/// A directed data dependency from a producing source to a consuming input
/// port. A destination port has at most one incoming edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEdge {
    pub source: ValueSource,
    pub dest: PortRef,
}

impl DataEdge {
    pub fn new(source: ValueSource, dest: PortRef) -> Self {
        Self { source, dest }
    }
}

/// A workflow-level input parameter, with an optional literal default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub name: String,
    pub ty: Type,
    pub default: Option<Literal>,
}

impl WorkflowInput {
    pub fn new(name: impl Into<String>, ty: Type, default: Option<Literal>) -> Self {
        Self {
            name: name.into(),
            ty,
            default,
        }
    }
}

/// A unit of work: typed input and output ports plus a command template.
///
/// The command template is computed by the graph builder and emitted
/// verbatim; the compiler does not interpret it. Task ids and port names
/// flow straight into the output, so the builder is responsible for making
/// them unique and WDL-legal (the validation pass checks this defensively).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub command_template: String,
    pub meta: HashMap<String, serde_json::Value>,
}

impl TaskNode {
    pub fn new(
        id: impl Into<String>,
        inputs: Vec<Port>,
        outputs: Vec<Port>,
        command_template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            inputs,
            outputs,
            command_template: command_template.into(),
            meta: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, meta: HashMap<String, serde_json::Value>) -> Self {
        self.meta = meta;
        self
    }

    /// Look up an input port by name.
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Look up an output port by name.
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }
}

/// The guard of one branch arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BranchCondition {
    /// Arm taken when the predicate port equals the literal
    Equals(Literal),
    /// Unconditional fallthrough arm; at most one, and only last
    Default,
}

/// One mutually exclusive arm of a branch: a guard plus its sub-region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchArm {
    pub condition: BranchCondition,
    pub body: Region,
}

impl BranchArm {
    pub fn new(condition: BranchCondition, body: Region) -> Self {
        Self { condition, body }
    }
}

/// A conditional dispatcher: a predicate-bearing output port selecting among
/// ordered, mutually exclusive arms.
///
/// The compiler trusts the source graph that arm conditions are semantically
/// exclusive; the emitted `if`/`else if` chain enforces exclusivity
/// structurally regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchNode {
    pub predicate: PortRef,
    pub arms: Vec<BranchArm>,
}

impl BranchNode {
    pub fn new(predicate: PortRef, arms: Vec<BranchArm>) -> Self {
        Self { predicate, arms }
    }

    /// Synthesized identifier used in diagnostics; branch nodes have no
    /// source-graph name of their own.
    pub fn diagnostic_id(&self) -> String {
        format!("if-{}", self.predicate.task)
    }
}

/// One statement slot of a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Invoke a task by id
    Call(String),
    /// Bind a workflow-scope variable to a value (merge-variable assignment)
    Assign {
        name: String,
        ty: Type,
        source: ValueSource,
    },
    /// Conditional dispatch over exclusive arms
    Branch(BranchNode),
    /// Iterate the body once per element of an Array-typed source
    Scatter {
        variable: String,
        source: ValueSource,
        body: Region,
    },
}

impl Step {
    /// Identifier used in diagnostics and dependency bookkeeping.
    pub fn diagnostic_id(&self) -> String {
        match self {
            Step::Call(task) => task.clone(),
            Step::Assign { name, .. } => name.clone(),
            Step::Branch(branch) => branch.diagnostic_id(),
            Step::Scatter { variable, .. } => format!("scatter-{}", variable),
        }
    }
}

/// A sequential region of the workflow body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    pub steps: Vec<Step>,
}

impl Region {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

/// The complete compiler input: task table, data edges, workflow-level
/// inputs, and the body region tree.
///
/// Tasks are keyed by id in declaration order; declaration order is the
/// tie-breaker everywhere ordering is otherwise unconstrained, which is what
/// makes re-compilation byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub name: String,
    pub inputs: Vec<WorkflowInput>,
    pub tasks: IndexMap<String, TaskNode>,
    pub edges: Vec<DataEdge>,
    pub body: Region,
}

impl WorkflowGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            tasks: IndexMap::new(),
            edges: Vec::new(),
            body: Region::default(),
        }
    }

    pub fn add_input(&mut self, input: WorkflowInput) -> &mut Self {
        self.inputs.push(input);
        self
    }

    pub fn add_task(&mut self, task: TaskNode) -> &mut Self {
        self.tasks.insert(task.id.clone(), task);
        self
    }

    pub fn add_edge(&mut self, edge: DataEdge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    pub fn set_body(&mut self, body: Region) -> &mut Self {
        self.body = body;
        self
    }

    /// Look up a task node by id.
    pub fn task(&self, id: &str) -> Option<&TaskNode> {
        self.tasks.get(id)
    }

    /// Look up a workflow-level input by name.
    pub fn workflow_input(&self, name: &str) -> Option<&WorkflowInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// All data edges feeding the given task's inputs.
    pub fn edges_into<'a>(&'a self, task: &'a str) -> impl Iterator<Item = &'a DataEdge> + 'a {
        self.edges.iter().filter(move |e| e.dest.task == task)
    }

    /// The single edge bound to an input port, if exactly one exists.
    pub fn binding(&self, dest: &PortRef) -> Option<&DataEdge> {
        let mut found = self.edges.iter().filter(|e| &e.dest == dest);
        let first = found.next();
        if found.next().is_some() {
            return None;
        }
        first
    }
}
