use super::validation::validate;
use super::*;
use crate::error::CompileError;

fn two_task_graph() -> WorkflowGraph {
    let mut graph = WorkflowGraph::new("wf");
    graph.add_input(WorkflowInput::new("count", Type::Int, Some(Literal::Int(1))));
    graph.add_task(TaskNode::new(
        "producer",
        vec![Port::new("input_0", Type::Int)],
        vec![Port::new("output_0", Type::Int)],
        "python producer.py ${input_0}",
    ));
    graph.add_task(TaskNode::new(
        "consumer",
        vec![Port::new("input_0", Type::Int)],
        vec![],
        "python consumer.py ${input_0}",
    ));
    graph.add_edge(DataEdge::new(
        ValueSource::workflow_input("count"),
        PortRef::new("producer", "input_0"),
    ));
    graph.add_edge(DataEdge::new(
        ValueSource::task_output("producer", "output_0"),
        PortRef::new("consumer", "input_0"),
    ));
    graph.set_body(Region::new(vec![
        Step::Call("producer".to_string()),
        Step::Call("consumer".to_string()),
    ]));
    graph
}

#[test]
fn test_value_source_rendering() {
    assert_eq!(ValueSource::task_output("align", "output_0").wdl_ref(), "align.output_0");
    assert_eq!(ValueSource::workflow_input("threshold").wdl_ref(), "threshold");
    assert_eq!(ValueSource::variable("merged").wdl_ref(), "merged");
    assert_eq!(PortRef::new("align", "output_0").to_string(), "align.output_0");
}

#[test]
fn test_port_lookup_on_task() {
    let graph = two_task_graph();
    let producer = graph.task("producer").unwrap();
    assert_eq!(producer.input("input_0").unwrap().ty, Type::Int);
    assert_eq!(producer.output("output_0").unwrap().ty, Type::Int);
    assert!(producer.input("output_0").is_none());
    assert!(graph.task("absent").is_none());
}

#[test]
fn test_edges_into_lists_only_that_tasks_edges() {
    let graph = two_task_graph();
    let name = String::from("consumer");
    let sources: Vec<&ValueSource> = graph.edges_into(&name).map(|e| &e.source).collect();
    assert_eq!(sources, vec![&ValueSource::task_output("producer", "output_0")]);
    assert_eq!(graph.edges_into("producer").count(), 1);
    assert_eq!(graph.edges_into("absent").count(), 0);
}

#[test]
fn test_binding_returns_single_producer_only() {
    let mut graph = two_task_graph();
    let dest = PortRef::new("consumer", "input_0");
    assert_eq!(
        graph.binding(&dest).unwrap().source,
        ValueSource::task_output("producer", "output_0")
    );
    graph.add_edge(DataEdge::new(ValueSource::workflow_input("count"), dest.clone()));
    assert!(graph.binding(&dest).is_none());
}

#[test]
fn test_step_diagnostic_ids() {
    assert_eq!(Step::Call("align".to_string()).diagnostic_id(), "align");
    let branch = Step::Branch(BranchNode::new(PortRef::new("selector", "output_0"), vec![]));
    assert_eq!(branch.diagnostic_id(), "if-selector");
    let scatter = Step::Scatter {
        variable: "sample".to_string(),
        source: ValueSource::workflow_input("samples"),
        body: Region::default(),
    };
    assert_eq!(scatter.diagnostic_id(), "scatter-sample");
}

#[test]
fn test_valid_graph_passes_validation() {
    assert!(validate(&two_task_graph()).is_ok());
}

#[test]
fn test_call_to_unknown_task() {
    let mut graph = two_task_graph();
    graph.body.steps.push(Step::Call("phantom".to_string()));
    match validate(&graph) {
        Err(CompileError::NoSuchTask { name }) => assert_eq!(name, "phantom"),
        other => panic!("expected missing task, got {:?}", other),
    }
}

#[test]
fn test_second_call_to_same_task_is_rejected() {
    let mut graph = two_task_graph();
    graph.body.steps.push(Step::Call("consumer".to_string()));
    match validate(&graph) {
        Err(CompileError::DuplicateIdentifier { name, .. }) => assert_eq!(name, "consumer"),
        other => panic!("expected duplicate call, got {:?}", other),
    }
}

#[test]
fn test_edge_to_missing_port() {
    let mut graph = two_task_graph();
    graph.add_edge(DataEdge::new(
        ValueSource::workflow_input("count"),
        PortRef::new("consumer", "input_9"),
    ));
    match validate(&graph) {
        Err(CompileError::NoSuchPort { task, port }) => {
            assert_eq!(task, "consumer");
            assert_eq!(port, "input_9");
        }
        other => panic!("expected missing port, got {:?}", other),
    }
}

#[test]
fn test_edge_from_missing_workflow_input() {
    let mut graph = two_task_graph();
    graph.edges[0].source = ValueSource::workflow_input("absent");
    match validate(&graph) {
        Err(CompileError::NoSuchInput { name }) => assert_eq!(name, "absent"),
        other => panic!("expected missing input, got {:?}", other),
    }
}

#[test]
fn test_incompatible_edge_types() {
    let mut graph = two_task_graph();
    graph.inputs[0].ty = Type::String;
    graph.inputs[0].default = None;
    match validate(&graph) {
        Err(CompileError::TypeConflict {
            subject,
            expected,
            actual,
        }) => {
            assert_eq!(subject, "producer.input_0");
            assert_eq!(expected, "Int");
            assert_eq!(actual, "String");
        }
        other => panic!("expected type conflict, got {:?}", other),
    }
}

#[test]
fn test_int_to_float_edge_coerces() {
    let mut graph = two_task_graph();
    let consumer = graph.tasks.get_mut("consumer").unwrap();
    consumer.inputs[0].ty = Type::Float;
    assert!(validate(&graph).is_ok());
}

#[test]
fn test_unbound_and_multiply_bound_inputs() {
    let mut graph = two_task_graph();
    graph.edges.remove(1);
    match validate(&graph) {
        Err(CompileError::UnboundInput { task, input }) => {
            assert_eq!(task, "consumer");
            assert_eq!(input, "input_0");
        }
        other => panic!("expected unbound input, got {:?}", other),
    }

    let mut graph = two_task_graph();
    graph.add_edge(DataEdge::new(
        ValueSource::workflow_input("count"),
        PortRef::new("consumer", "input_0"),
    ));
    match validate(&graph) {
        Err(CompileError::MultipleBindings { task, input }) => {
            assert_eq!(task, "consumer");
            assert_eq!(input, "input_0");
        }
        other => panic!("expected multiple bindings, got {:?}", other),
    }
}

#[test]
fn test_uncalled_task_inputs_are_not_binding_checked() {
    // A task nobody calls may have unbound inputs; it only draws a warning
    // later, in the ordering pass.
    let mut graph = two_task_graph();
    graph.add_task(TaskNode::new(
        "spare",
        vec![Port::new("input_0", Type::Int)],
        vec![],
        "true",
    ));
    assert!(validate(&graph).is_ok());
}

#[test]
fn test_default_arm_must_be_last() {
    let mut graph = two_task_graph();
    let arms = vec![
        BranchArm::new(BranchCondition::Default, Region::default()),
        BranchArm::new(
            BranchCondition::Equals(Literal::Int(1)),
            Region::default(),
        ),
    ];
    graph.body.steps.push(Step::Branch(BranchNode::new(
        PortRef::new("producer", "output_0"),
        arms,
    )));
    match validate(&graph) {
        Err(CompileError::MalformedBranch { branch, message }) => {
            assert_eq!(branch, "if-producer");
            assert_eq!(message, "default arm must be last");
        }
        other => panic!("expected malformed branch, got {:?}", other),
    }
}

#[test]
fn test_branch_without_arms_is_rejected() {
    let mut graph = two_task_graph();
    graph.body.steps.push(Step::Branch(BranchNode::new(
        PortRef::new("producer", "output_0"),
        vec![],
    )));
    match validate(&graph) {
        Err(CompileError::MalformedBranch { branch, .. }) => assert_eq!(branch, "if-producer"),
        other => panic!("expected malformed branch, got {:?}", other),
    }
}

#[test]
fn test_condition_literal_must_match_predicate_type() {
    let mut graph = two_task_graph();
    graph.body.steps.push(Step::Branch(BranchNode::new(
        PortRef::new("producer", "output_0"),
        vec![BranchArm::new(
            BranchCondition::Equals(Literal::String("yes".to_string())),
            Region::default(),
        )],
    )));
    match validate(&graph) {
        Err(CompileError::TypeConflict { expected, .. }) => assert_eq!(expected, "Int"),
        other => panic!("expected type conflict, got {:?}", other),
    }
}

#[test]
fn test_scatter_source_must_be_array() {
    let mut graph = two_task_graph();
    graph.body.steps = vec![Step::Scatter {
        variable: "item".to_string(),
        source: ValueSource::workflow_input("count"),
        body: Region::default(),
    }];
    match validate(&graph) {
        Err(CompileError::TypeConflict {
            subject, expected, ..
        }) => {
            assert_eq!(subject, "scatter-item");
            assert_eq!(expected, "Array");
        }
        other => panic!("expected type conflict, got {:?}", other),
    }
}

#[test]
fn test_variable_colliding_with_task_id() {
    let mut graph = two_task_graph();
    graph.body.steps.push(Step::Assign {
        name: "producer".to_string(),
        ty: Type::Int,
        source: ValueSource::workflow_input("count"),
    });
    match validate(&graph) {
        Err(CompileError::DuplicateIdentifier { name, .. }) => assert_eq!(name, "producer"),
        other => panic!("expected duplicate identifier, got {:?}", other),
    }
}

#[test]
fn test_illegal_identifiers_are_rejected() {
    let mut graph = two_task_graph();
    graph.add_task(TaskNode::new("2fast", vec![], vec![], "true"));
    match validate(&graph) {
        Err(CompileError::IllegalIdentifier { name, .. }) => assert_eq!(name, "2fast"),
        other => panic!("expected illegal identifier, got {:?}", other),
    }

    let mut graph = two_task_graph();
    graph.add_input(WorkflowInput::new("scatter", Type::Int, None));
    match validate(&graph) {
        Err(CompileError::IllegalIdentifier { name, context }) => {
            assert_eq!(name, "scatter");
            assert!(context.contains("reserved word"));
        }
        other => panic!("expected illegal identifier, got {:?}", other),
    }
}

#[test]
fn test_default_literal_must_match_input_type() {
    let mut graph = two_task_graph();
    graph.inputs[0].default = Some(Literal::String("three".to_string()));
    match validate(&graph) {
        Err(CompileError::TypeConflict { subject, .. }) => assert_eq!(subject, "count"),
        other => panic!("expected type conflict, got {:?}", other),
    }
}

#[test]
fn test_graph_round_trips_through_json() {
    let graph = two_task_graph();
    let json = serde_json::to_string(&graph).unwrap();
    let back: WorkflowGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(back, graph);
}
