//! Scope resolution for conditionally assigned variables.
//!
//! WDL requires a variable that is assigned inside a conditional block and
//! read after it to be declared in the enclosing workflow scope, ahead of
//! the conditional. This pass finds every such variable, unifies its type
//! across the arms that assign it, and records a type-only declaration to be
//! emitted immediately before the owning branch. The resulting table is
//! immutable; the emitter only reads it.
//!
//! When a branch set is non-exhaustive (no default arm), the hoisted
//! variable is undefined on the missing path. The compiler does not
//! synthesize a default value; providing one is the graph builder's
//! responsibility.

use indexmap::IndexMap;

use crate::error::CompileError;
use crate::graph::{Region, Step, ValueSource, WorkflowGraph};
use crate::types::Type;

/// A type-only declaration to emit ahead of a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct HoistedDecl {
    pub name: String,
    pub ty: Type,
}

/// Output of scope resolution: hoisted declarations grouped by the branch
/// they precede, in emission order.
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    by_branch: IndexMap<usize, Vec<HoistedDecl>>,
    hoisted: IndexMap<String, Type>,
}

impl ScopeTable {
    /// Declarations to emit immediately before the branch with the given
    /// pre-order index.
    pub fn hoisted_for(&self, branch_index: usize) -> &[HoistedDecl] {
        self.by_branch
            .get(&branch_index)
            .map(|decls| decls.as_slice())
            .unwrap_or(&[])
    }

    /// Whether assignments to this variable target a hoisted declaration
    /// (bare assignment) rather than declaring it inline.
    pub fn is_hoisted(&self, name: &str) -> bool {
        self.hoisted.contains_key(name)
    }

    /// All hoisted declarations in emission order.
    pub fn declarations(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.hoisted.iter()
    }
}

/// Position of a statement relative to branch arms: the chain of
/// (branch pre-order index, arm index) pairs enclosing it.
type ArmPath = Vec<(usize, usize)>;

#[derive(Debug)]
struct Assignment {
    name: String,
    ty: Type,
    path: ArmPath,
}

#[derive(Debug)]
struct Read {
    name: String,
    path: ArmPath,
}

/// Resolve hoisted declarations for an ordered body.
///
/// Branch pre-order indices here match the order in which the emitter
/// encounters branches, so the table keys line up with emission.
pub fn resolve_scope(graph: &WorkflowGraph, body: &Region) -> Result<ScopeTable, CompileError> {
    let mut assignments = Vec::new();
    let mut reads = Vec::new();
    let mut next_branch = 0usize;
    walk(graph, body, &mut Vec::new(), &mut next_branch, &mut assignments, &mut reads);

    // Group assignments by variable, preserving first-assignment order.
    let mut grouped: IndexMap<String, Vec<&Assignment>> = IndexMap::new();
    for assignment in &assignments {
        grouped
            .entry(assignment.name.clone())
            .or_default()
            .push(assignment);
    }

    let mut hoists: Vec<(usize, HoistedDecl)> = Vec::new();
    for (name, group) in &grouped {
        let ty = &group[0].ty;
        for later in &group[1..] {
            if later.ty != *ty {
                return Err(CompileError::type_conflict(name, ty, &later.ty));
            }
        }

        // Top-level assignments are ordinary declarations, never hoisted.
        if group.iter().all(|a| a.path.is_empty()) {
            continue;
        }

        // Hoist when some read of the variable is not covered by the arm
        // that assigns it.
        let escapes = reads.iter().filter(|r| r.name == *name).any(|read| {
            !group
                .iter()
                .any(|a| read.path.starts_with(&a.path))
        });
        if !escapes {
            continue;
        }

        let branch = group
            .iter()
            .filter_map(|a| a.path.first().map(|(b, _)| *b))
            .min()
            .expect("non-top-level assignment has a branch");
        hoists.push((
            branch,
            HoistedDecl {
                name: name.clone(),
                ty: ty.clone(),
            },
        ));
    }

    // Emission order: branch position first, discovery order within it.
    hoists.sort_by_key(|(branch, _)| *branch);

    let mut table = ScopeTable::default();
    for (branch, decl) in hoists {
        table.hoisted.insert(decl.name.clone(), decl.ty.clone());
        table.by_branch.entry(branch).or_default().push(decl);
    }
    Ok(table)
}

fn walk(
    graph: &WorkflowGraph,
    region: &Region,
    path: &mut ArmPath,
    next_branch: &mut usize,
    assignments: &mut Vec<Assignment>,
    reads: &mut Vec<Read>,
) {
    for step in &region.steps {
        match step {
            Step::Call(task) => {
                for edge in graph.edges_into(task) {
                    if let ValueSource::Variable { name } = &edge.source {
                        reads.push(Read {
                            name: name.clone(),
                            path: path.clone(),
                        });
                    }
                }
            }
            Step::Assign { name, ty, source } => {
                if let ValueSource::Variable { name: read } = source {
                    reads.push(Read {
                        name: read.clone(),
                        path: path.clone(),
                    });
                }
                assignments.push(Assignment {
                    name: name.clone(),
                    ty: ty.clone(),
                    path: path.clone(),
                });
            }
            Step::Branch(branch) => {
                let index = *next_branch;
                *next_branch += 1;
                for (arm_index, arm) in branch.arms.iter().enumerate() {
                    path.push((index, arm_index));
                    walk(graph, &arm.body, path, next_branch, assignments, reads);
                    path.pop();
                }
            }
            Step::Scatter { source, body, .. } => {
                if let ValueSource::Variable { name } = source {
                    reads.push(Read {
                        name: name.clone(),
                        path: path.clone(),
                    });
                }
                // Scatter bodies stay in the same arm scope.
                walk(graph, body, path, next_branch, assignments, reads);
            }
        }
    }
}
