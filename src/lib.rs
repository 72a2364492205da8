//! # wdlgen
//!
//! Compiles an in-memory workflow graph - task nodes with typed data ports,
//! conditional branches, and data-dependency edges - into an equivalent WDL
//! (Workflow Description Language) source document.
//!
//! The compiler is a sequence of pure passes with explicit handoff:
//! validation, topological ordering, scope resolution for conditionally
//! assigned variables, and text emission. Compiling the same graph twice
//! yields byte-identical output.

pub mod compiler;
pub mod emit;
pub mod error;
pub mod graph;
pub mod order;
pub mod scope;
pub mod types;
pub mod value;


pub use compiler::{compile, CompileOutput};
pub use emit::Emitter;
pub use error::{CompileError, Warning};
pub use graph::{
    BranchArm, BranchCondition, BranchNode, DataEdge, Port, PortRef, Region, Step, TaskNode,
    ValueSource, WorkflowGraph, WorkflowInput,
};
pub use order::{order_body, NodeState, OrderedWorkflow};
pub use scope::{resolve_scope, HoistedDecl, ScopeTable};
pub use types::Type;
pub use value::Literal;
