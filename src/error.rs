//! Error types for workflow-graph compilation.
//!
//! Every fatal error aborts compilation before any WDL text is produced; the
//! emitter never writes a partial document. Non-fatal findings are reported
//! as [`Warning`]s alongside the emitted text.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for all graph-to-WDL compilation failures.
///
/// Each variant carries the identifiers of the offending node, edge, or port
/// so diagnostics can name the exact graph entity at fault.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The data-edge relation contains a cycle
    #[error("cyclic dependency involving {}", nodes.join(", "))]
    CyclicDependency { nodes: Vec<String> },

    /// A required task input has no producing port and no workflow-level binding
    #[error("unbound input {task}.{input}")]
    UnboundInput { task: String, input: String },

    /// A destination port has more than one incoming data edge
    #[error("multiple bindings for input {task}.{input}")]
    MultipleBindings { task: String, input: String },

    /// Types disagree across a data edge, an assignment, or branch arms
    #[error("type conflict on {subject}: expected {expected}, got {actual}")]
    TypeConflict {
        subject: String,
        expected: String,
        actual: String,
    },

    /// A node is depended upon by the emitted body but never placed in it
    #[error("unreachable node {node}")]
    UnreachableNode { node: String },

    /// A data edge or condition references a port that does not exist
    #[error("no such port {task}.{port}")]
    NoSuchPort { task: String, port: String },

    /// A call names a task that does not exist in the task table
    #[error("no such task {name}")]
    NoSuchTask { name: String },

    /// A reference names a workflow-level input or scope variable that is
    /// never defined
    #[error("no such workflow input or variable {name}")]
    NoSuchInput { name: String },

    /// Two graph entities claim a name that must be unique in the output
    #[error("duplicate identifier {name} ({context})")]
    DuplicateIdentifier { name: String, context: String },

    /// An identifier is not legal WDL (bad characters or a reserved word)
    #[error("illegal WDL identifier {name} ({context})")]
    IllegalIdentifier { name: String, context: String },

    /// Branch arms violate structural rules (empty arm list, default not last)
    #[error("malformed branch {branch}: {message}")]
    MalformedBranch { branch: String, message: String },
}

impl CompileError {
    /// Create an unbound-input error.
    pub fn unbound_input(task: impl Into<String>, input: impl Into<String>) -> Self {
        CompileError::UnboundInput {
            task: task.into(),
            input: input.into(),
        }
    }

    /// Create a type-conflict error.
    pub fn type_conflict(
        subject: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        CompileError::TypeConflict {
            subject: subject.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a duplicate-identifier error.
    pub fn duplicate(name: impl Into<String>, context: impl Into<String>) -> Self {
        CompileError::DuplicateIdentifier {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Create an illegal-identifier error.
    pub fn illegal(name: impl Into<String>, context: impl Into<String>) -> Self {
        CompileError::IllegalIdentifier {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Create a malformed-branch error.
    pub fn malformed_branch(branch: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::MalformedBranch {
            branch: branch.into(),
            message: message.into(),
        }
    }

    /// Get the principal offending node identifier, if the error has one.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            CompileError::CyclicDependency { nodes } => nodes.first().map(|s| s.as_str()),
            CompileError::UnboundInput { task, .. } => Some(task),
            CompileError::MultipleBindings { task, .. } => Some(task),
            CompileError::TypeConflict { subject, .. } => Some(subject),
            CompileError::UnreachableNode { node } => Some(node),
            CompileError::NoSuchPort { task, .. } => Some(task),
            CompileError::NoSuchTask { name } => Some(name),
            CompileError::NoSuchInput { name } => Some(name),
            CompileError::DuplicateIdentifier { name, .. } => Some(name),
            CompileError::IllegalIdentifier { name, .. } => Some(name),
            CompileError::MalformedBranch { branch, .. } => Some(branch),
        }
    }
}

/// Non-fatal findings reported alongside a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    /// A task was declared in the graph but is never called and never read;
    /// its task block is not emitted.
    UnusedNode { node: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnusedNode { node } => write!(f, "unused node {}", node),
        }
    }
}
