//! WDL text emission.
//!
//! Walks the ordered body and the scope table, producing the final document:
//! one `task` block per referenced task node, then a single `workflow` block
//! with input declarations, hoisted scope declarations, calls, branch
//! chains, and scatter blocks. Emission is infallible; every fatal condition
//! is rejected by the earlier passes, so a partial document is never
//! produced.
//!
//! Task ids and port names flow into the text verbatim. Task outputs are
//! bound to `read_<type>(<task_id>_<output_name>.txt)`, the file-based
//! output contract expected by downstream engines.

use crate::graph::{BranchCondition, BranchNode, Region, Step, TaskNode, WorkflowGraph};
use crate::order::OrderedWorkflow;
use crate::scope::ScopeTable;

/// Renders a workflow graph as WDL source.
#[derive(Debug, Clone)]
pub struct Emitter {
    ind: String,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    /// Emitter with the conventional four-space indentation.
    pub fn new() -> Self {
        Self {
            ind: "    ".to_string(),
        }
    }

    /// Emitter with a custom indentation unit.
    pub fn with_indentation(ind: impl Into<String>) -> Self {
        Self { ind: ind.into() }
    }

    /// Produce the complete WDL document.
    pub fn emit_document(
        &self,
        graph: &WorkflowGraph,
        ordered: &OrderedWorkflow,
        scope: &ScopeTable,
    ) -> String {
        let mut blocks: Vec<String> = ordered
            .task_order
            .iter()
            .filter_map(|id| graph.task(id))
            .map(|task| self.emit_task(task))
            .collect();
        blocks.push(self.emit_workflow(graph, ordered, scope));
        let mut doc = blocks.join("\n\n");
        doc.push('\n');
        doc
    }

    fn indent(&self, depth: usize) -> String {
        self.ind.repeat(depth)
    }

    fn emit_task(&self, task: &TaskNode) -> String {
        let i1 = self.indent(1);
        let i2 = self.indent(2);
        let mut sections = Vec::new();

        if !task.inputs.is_empty() {
            let mut s = format!("{}input {{\n", i1);
            for port in &task.inputs {
                s.push_str(&format!("{}{} {}\n", i2, port.ty, port.name));
            }
            s.push_str(&format!("{}}}", i1));
            sections.push(s);
        }

        let mut command = format!("{}command {{\n", i1);
        for line in task.command_template.lines() {
            command.push_str(&format!("{}{}\n", i2, line));
        }
        command.push_str(&format!("{}}}", i1));
        sections.push(command);

        if !task.outputs.is_empty() {
            let mut s = format!("{}output {{\n", i1);
            for port in &task.outputs {
                s.push_str(&format!(
                    "{}{} {}_{} = {}({}_{}.txt)\n",
                    i2,
                    port.ty,
                    task.id,
                    port.name,
                    port.ty.read_fn(),
                    task.id,
                    port.name
                ));
            }
            s.push_str(&format!("{}}}", i1));
            sections.push(s);
        }

        if !task.meta.is_empty() {
            let mut keys: Vec<&String> = task.meta.keys().collect();
            keys.sort();
            let mut s = format!("{}meta {{\n", i1);
            for key in keys {
                let value = serde_json::to_string(&task.meta[key]).unwrap_or_default();
                s.push_str(&format!("{}{}: {}\n", i2, key, value));
            }
            s.push_str(&format!("{}}}", i1));
            sections.push(s);
        }

        format!("task {} {{\n{}\n}}", task.id, sections.join("\n\n"))
    }

    fn emit_workflow(
        &self,
        graph: &WorkflowGraph,
        ordered: &OrderedWorkflow,
        scope: &ScopeTable,
    ) -> String {
        let i1 = self.indent(1);
        let i2 = self.indent(2);
        let mut chunks = Vec::new();

        if !graph.inputs.is_empty() {
            let mut s = format!("{}input {{\n", i1);
            for input in &graph.inputs {
                match &input.default {
                    Some(default) => {
                        s.push_str(&format!("{}{} {} = {}\n", i2, input.ty, input.name, default))
                    }
                    None => s.push_str(&format!("{}{} {}\n", i2, input.ty, input.name)),
                }
            }
            s.push_str(&format!("{}}}", i1));
            chunks.push(s);
        }

        let mut branch_counter = 0usize;
        chunks.extend(self.emit_region(graph, &ordered.body, scope, &mut branch_counter, 1));

        format!("workflow {} {{\n{}\n}}", graph.name, chunks.join("\n\n"))
    }

    /// Emit one chunk per statement. At the top level chunks are separated
    /// by blank lines; nested regions join them with single newlines.
    fn emit_region(
        &self,
        graph: &WorkflowGraph,
        region: &Region,
        scope: &ScopeTable,
        branch_counter: &mut usize,
        depth: usize,
    ) -> Vec<String> {
        let mut chunks = Vec::new();
        for step in &region.steps {
            match step {
                Step::Call(task) => chunks.push(self.emit_call(graph, task, depth)),
                Step::Assign { name, ty, source } => {
                    let p = self.indent(depth);
                    if scope.is_hoisted(name) {
                        chunks.push(format!("{}{} = {}", p, name, source.wdl_ref()));
                    } else {
                        chunks.push(format!("{}{} {} = {}", p, ty, name, source.wdl_ref()));
                    }
                }
                Step::Branch(branch) => {
                    chunks.push(self.emit_branch(graph, branch, scope, branch_counter, depth))
                }
                Step::Scatter {
                    variable,
                    source,
                    body,
                } => {
                    let p = self.indent(depth);
                    let inner = self
                        .emit_region(graph, body, scope, branch_counter, depth + 1)
                        .join("\n");
                    chunks.push(format!(
                        "{}scatter ({} in {}) {{\n{}\n{}}}",
                        p,
                        variable,
                        source.wdl_ref(),
                        inner,
                        p
                    ));
                }
            }
        }
        chunks
    }

    fn emit_call(&self, graph: &WorkflowGraph, task_id: &str, depth: usize) -> String {
        let p = self.indent(depth);
        let task = match graph.task(task_id) {
            Some(task) => task,
            None => return format!("{}call {}", p, task_id),
        };
        if task.inputs.is_empty() {
            return format!("{}call {}", p, task_id);
        }
        let mut s = format!("{}call {} {{\n{}input:\n", p, task_id, self.indent(depth + 1));
        for port in &task.inputs {
            // Validation guarantees exactly one binding per input port.
            if let Some(edge) = graph.binding(&crate::graph::PortRef::new(task_id, &port.name)) {
                s.push_str(&format!(
                    "{}{} = {},\n",
                    self.indent(depth + 2),
                    port.name,
                    edge.source.wdl_ref()
                ));
            }
        }
        s.push_str(&format!("{}}}", p));
        s
    }

    /// Render a branch as an `if`/`else if` chain. The hoisted declarations
    /// registered for this branch are placed immediately ahead of the `if`,
    /// type-only, so assignments inside the arms stay visible after the
    /// chain closes.
    fn emit_branch(
        &self,
        graph: &WorkflowGraph,
        branch: &BranchNode,
        scope: &ScopeTable,
        branch_counter: &mut usize,
        depth: usize,
    ) -> String {
        let p = self.indent(depth);
        let index = *branch_counter;
        *branch_counter += 1;

        let mut s = String::new();
        let hoisted = scope.hoisted_for(index);
        if !hoisted.is_empty() {
            for decl in hoisted {
                s.push_str(&format!("{}{} {}\n", p, decl.ty, decl.name));
            }
            s.push('\n');
        }

        for (i, arm) in branch.arms.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "else if" };
            let header = match &arm.condition {
                BranchCondition::Equals(literal) => format!(
                    "{}{} ({}.{} == {}) {{\n",
                    p, keyword, branch.predicate.task, branch.predicate.port, literal
                ),
                BranchCondition::Default => {
                    if i == 0 {
                        format!("{}if (true) {{\n", p)
                    } else {
                        format!("{}else {{\n", p)
                    }
                }
            };
            s.push_str(&header);
            let inner = self
                .emit_region(graph, &arm.body, scope, branch_counter, depth + 1)
                .join("\n");
            s.push_str(&inner);
            s.push_str(&format!("\n{}}}", p));
            if i + 1 != branch.arms.len() {
                s.push('\n');
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DataEdge, Port, PortRef, ValueSource, WorkflowGraph, WorkflowInput};
    use crate::order::order_body;
    use crate::scope::resolve_scope;
    use crate::types::Type;
    use crate::value::Literal;
    use pretty_assertions::assert_eq;

    fn emit(graph: &WorkflowGraph) -> String {
        let ordered = order_body(graph).unwrap();
        let scope = resolve_scope(graph, &ordered.body).unwrap();
        Emitter::new().emit_document(graph, &ordered, &scope)
    }

    #[test]
    fn test_task_block_shape() {
        let task = TaskNode::new(
            "greet",
            vec![Port::new("input_0", Type::String)],
            vec![Port::new("output_0", Type::String)],
            "python greet.py ${input_0}",
        );
        let text = Emitter::new().emit_task(&task);
        assert_eq!(
            text,
            "task greet {\n    input {\n        String input_0\n    }\n\n    command {\n        python greet.py ${input_0}\n    }\n\n    output {\n        String greet_output_0 = read_string(greet_output_0.txt)\n    }\n}"
        );
    }

    #[test]
    fn test_task_block_without_outputs_omits_output_section() {
        let task = TaskNode::new("finish", vec![], vec![], "echo done");
        let text = Emitter::new().emit_task(&task);
        assert_eq!(text, "task finish {\n    command {\n        echo done\n    }\n}");
    }

    #[test]
    fn test_meta_block_rendering() {
        let mut meta = std::collections::HashMap::new();
        meta.insert("author".to_string(), serde_json::json!("pipeline-team"));
        meta.insert("retries".to_string(), serde_json::json!(2));
        let task = TaskNode::new("annotated", vec![], vec![], "true").with_meta(meta);
        let text = Emitter::new().emit_task(&task);
        assert_eq!(
            text,
            "task annotated {\n    command {\n        true\n    }\n\n    meta {\n        author: \"pipeline-team\"\n        retries: 2\n    }\n}"
        );
    }

    #[test]
    fn test_workflow_input_defaults() {
        let mut graph = WorkflowGraph::new("wf");
        graph.add_input(WorkflowInput::new("threshold", Type::Int, Some(Literal::Int(3))));
        graph.add_input(WorkflowInput::new("verbose", Type::Boolean, None));
        let text = emit(&graph);
        assert_eq!(
            text,
            "workflow wf {\n    input {\n        Int threshold = 3\n        Boolean verbose\n    }\n}\n"
        );
    }

    #[test]
    fn test_scatter_block() {
        let mut graph = WorkflowGraph::new("wf");
        graph.add_input(WorkflowInput::new(
            "samples",
            Type::array(Type::String),
            None,
        ));
        graph.add_task(TaskNode::new(
            "process",
            vec![Port::new("input_0", Type::String)],
            vec![],
            "python process.py ${input_0}",
        ));
        graph.add_edge(DataEdge::new(
            ValueSource::variable("sample"),
            PortRef::new("process", "input_0"),
        ));
        graph.set_body(Region::new(vec![Step::Scatter {
            variable: "sample".to_string(),
            source: ValueSource::workflow_input("samples"),
            body: Region::new(vec![Step::Call("process".to_string())]),
        }]));
        let text = emit(&graph);
        let expected = "\
task process {
    input {
        String input_0
    }

    command {
        python process.py ${input_0}
    }
}

workflow wf {
    input {
        Array[String] samples
    }

    scatter (sample in samples) {
        call process {
            input:
                input_0 = sample,
        }
    }
}
";
        assert_eq!(text, expected);
    }
}
