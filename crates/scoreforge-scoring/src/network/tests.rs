use std::sync::Arc;

use scoreforge_core::{
    Expr, FactClassDescriptor, FieldDescriptor, FieldType, SimpleScore, SolutionDescriptor,
};

use super::{Network, NodeKind, NodeKindTag};
use crate::collector;
use crate::error::EngineError;
use crate::joiner;
use crate::stream::{Constraint, Stream};

const TASK: usize = 0;
const WORKER: usize = 1;
const SLOT: usize = 2;

// Task fields.
const SIZE: usize = 0;
const OWNER: usize = 1;
const LABEL: usize = 2;
// Worker fields.
const CAPACITY: usize = 0;

fn descriptor() -> Arc<SolutionDescriptor> {
    let mut descriptor = SolutionDescriptor::new("Plan");
    descriptor
        .add_class(
            FactClassDescriptor::new("Task")
                .with_field(FieldDescriptor::new("size", FieldType::Int))
                .with_field(FieldDescriptor::new("owner", FieldType::Fact))
                .with_field(FieldDescriptor::new("label", FieldType::Str)),
        )
        .unwrap();
    descriptor
        .add_class(
            FactClassDescriptor::new("Worker")
                .with_field(FieldDescriptor::new("capacity", FieldType::Int)),
        )
        .unwrap();
    descriptor
        .add_class(
            FactClassDescriptor::new("Slot")
                .with_field(FieldDescriptor::planning_variable("worker", FieldType::Fact)),
        )
        .unwrap();
    Arc::new(descriptor)
}

fn build(constraints: Vec<Constraint<SimpleScore>>) -> Result<Network<SimpleScore>, EngineError> {
    Network::build(descriptor(), constraints)
}

fn big_tasks() -> Stream {
    Stream::for_each(TASK).filter(Expr::gt(Expr::field(0, SIZE), Expr::int(5)))
}

#[test]
fn test_identical_prefixes_share_nodes() {
    let network = build(vec![
        big_tasks().penalize(SimpleScore::ONE).as_constraint("Big task"),
        big_tasks().reward(SimpleScore::ONE).as_constraint("Big task bonus"),
    ])
    .unwrap();

    let stats = network.stats();
    assert_eq!(stats.count(NodeKindTag::ForEach), 1);
    assert_eq!(stats.count(NodeKindTag::Filter), 1);
    assert_eq!(stats.count(NodeKindTag::Scorer), 2);
    assert_eq!(stats.node_count, 4);
    assert_eq!(stats.shared_hits, 2);

    let filter = network
        .nodes()
        .iter()
        .find(|n| n.kind.tag() == NodeKindTag::Filter)
        .unwrap();
    assert_eq!(filter.constraints, vec!["Big task", "Big task bonus"]);
    assert_eq!(filter.children.len(), 2);
}

#[test]
fn test_divergent_filters_share_only_the_root() {
    let network = build(vec![
        big_tasks().penalize(SimpleScore::ONE).as_constraint("Big"),
        Stream::for_each(TASK)
            .filter(Expr::lt(Expr::field(0, SIZE), Expr::int(2)))
            .penalize(SimpleScore::ONE)
            .as_constraint("Small"),
    ])
    .unwrap();

    assert_eq!(network.stats().count(NodeKindTag::ForEach), 1);
    assert_eq!(network.stats().count(NodeKindTag::Filter), 2);
    assert_eq!(network.stats().shared_hits, 1);
}

#[test]
fn test_unassigned_exclusion_filter_is_generated() {
    let network = build(vec![
        Stream::for_each(SLOT)
            .penalize(SimpleScore::ONE)
            .as_constraint("Assigned"),
        Stream::for_each_including_unassigned(SLOT)
            .penalize(SimpleScore::ONE)
            .as_constraint("Any"),
    ])
    .unwrap();

    let filters: Vec<_> = network
        .nodes()
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Filter { predicate, .. } => Some(predicate.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        filters,
        vec![Expr::all([Expr::is_not_none(Expr::field(0, 0))])]
    );
    assert_eq!(network.stats().count(NodeKindTag::ForEach), 1);
}

#[test]
fn test_layers_hold_tuple_sources_in_topological_order() {
    let network = build(vec![big_tasks()
        .join(
            Stream::for_each(WORKER),
            [joiner::equal(Expr::field(0, OWNER), Expr::element(0))],
        )
        .group_by([Expr::element(1)], [collector::sum(Expr::field(0, SIZE))])
        .filter(Expr::gt(Expr::element(1), Expr::field(0, CAPACITY)))
        .penalize(SimpleScore::ONE)
        .as_constraint("Overloaded")])
    .unwrap();

    let nodes = network.nodes();
    let layers = network.layers();
    for (depth, layer) in layers.iter().enumerate() {
        for id in layer {
            let node = &nodes[id.0];
            assert!(node.kind.is_tuple_source());
            assert_eq!(node.layer, depth);
            for parent in &node.parents {
                assert!(nodes[parent.0].layer < node.layer);
            }
        }
    }
    let tags: Vec<NodeKindTag> = layers
        .iter()
        .flatten()
        .map(|id| nodes[id.0].kind.tag())
        .collect();
    assert_eq!(
        tags,
        vec![
            NodeKindTag::ForEach,
            NodeKindTag::ForEach,
            NodeKindTag::Join,
            NodeKindTag::Group
        ]
    );
}

#[test]
fn test_store_sizes_count_consumers() {
    let network = build(vec![
        big_tasks().penalize(SimpleScore::ONE).as_constraint("Big"),
        Stream::for_each(TASK)
            .join(Stream::for_each(TASK), [])
            .penalize(SimpleScore::ONE)
            .as_constraint("Pairs"),
    ])
    .unwrap();

    let root = network.root(TASK).unwrap();
    // Filter, its scorer, both join sides.
    assert_eq!(network.nodes()[root.0].store_size, 4);
    let join = network
        .nodes()
        .iter()
        .find(|n| n.kind.tag() == NodeKindTag::Join)
        .unwrap();
    assert_eq!(join.store_size, 1);
    assert_eq!(join.arity, 2);
}

#[test]
fn test_observed_fields() {
    let network = build(vec![big_tasks()
        .if_exists(
            Stream::for_each(WORKER),
            [joiner::equal(Expr::field(0, OWNER), Expr::element(0))],
        )
        .penalize(SimpleScore::ONE)
        .as_constraint("Owned big task")])
    .unwrap();

    assert!(network.observes(TASK, SIZE));
    assert!(network.observes(TASK, OWNER));
    assert!(!network.observes(TASK, LABEL));
    assert!(!network.observes(WORKER, CAPACITY));
}

#[test]
fn test_reference_reads_make_observation_conservative() {
    let network = build(vec![Stream::for_each(TASK)
        .filter(Expr::gt(
            Expr::ref_field(Expr::field(0, OWNER), CAPACITY),
            Expr::int(3),
        ))
        .penalize(SimpleScore::ONE)
        .as_constraint("Strong owner")])
    .unwrap();

    assert!(network.observes(TASK, LABEL));
    assert!(network.observes(WORKER, CAPACITY));
}

#[test]
fn test_constraint_lookup() {
    let network = build(vec![
        big_tasks().penalize(SimpleScore::ONE).as_constraint("Big"),
        Stream::for_each(WORKER)
            .penalize(SimpleScore::ONE)
            .as_constraint_in("plan", "Workers"),
    ])
    .unwrap();

    assert_eq!(network.constraint_count(), 2);
    assert_eq!(network.constraint_index("Big"), Some(0));
    assert_eq!(network.constraint_index("Workers"), Some(1));
    assert_eq!(network.constraint_index("plan/Workers"), Some(1));
    assert_eq!(network.constraint_index("Nope"), None);
    let names: Vec<&str> = network.constraint_refs().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Big", "Workers"]);
}

#[test]
fn test_duplicate_constraint_names_are_rejected() {
    let err = build(vec![
        big_tasks().penalize(SimpleScore::ONE).as_constraint("Big"),
        big_tasks().reward(SimpleScore::ONE).as_constraint("Big"),
    ])
    .unwrap_err();
    assert!(matches!(err, EngineError::Definition { reason, .. } if reason.contains("duplicate")));
}

#[test]
fn test_definition_errors_name_the_stream() {
    let out_of_arity = Stream::for_each(TASK)
        .filter(Expr::eq(Expr::element(1), Expr::int(0)))
        .penalize(SimpleScore::ONE)
        .as_constraint("Bad element");
    match build(vec![out_of_arity]).unwrap_err() {
        EngineError::Definition { stream, reason } => {
            assert!(stream.starts_with("forEach("), "{}", stream);
            assert!(reason.contains("arity 1"), "{}", reason);
        }
        other => panic!("unexpected error {other}"),
    }

    let bad_field = Stream::for_each(WORKER)
        .filter(Expr::eq(Expr::field(0, 4), Expr::int(0)))
        .penalize(SimpleScore::ONE)
        .as_constraint("Bad field");
    assert!(matches!(
        build(vec![bad_field]),
        Err(EngineError::Definition { .. })
    ));

    let unknown_class = Stream::for_each(9)
        .penalize(SimpleScore::ONE)
        .as_constraint("Ghost");
    assert!(matches!(
        build(vec![unknown_class]),
        Err(EngineError::Definition { .. })
    ));
}

#[test]
fn test_empty_map_and_group_are_rejected() {
    let empty_map = Stream::for_each(TASK)
        .map(Vec::new())
        .penalize(SimpleScore::ONE)
        .as_constraint("Empty map");
    assert!(matches!(
        build(vec![empty_map]),
        Err(EngineError::Definition { .. })
    ));

    let empty_group = Stream::for_each(TASK)
        .group_by(Vec::new(), Vec::new())
        .penalize(SimpleScore::ONE)
        .as_constraint("Empty group");
    assert!(matches!(
        build(vec![empty_group]),
        Err(EngineError::Definition { .. })
    ));
}

#[test]
fn test_concat_reserves_a_slot_per_side() {
    let tasks = Stream::for_each(TASK);
    let network = build(vec![
        tasks
            .clone()
            .concat(tasks.clone())
            .penalize(SimpleScore::ONE)
            .as_constraint("Twice"),
        tasks
            .clone()
            .concat(tasks)
            .reward(SimpleScore::ONE)
            .as_constraint("Twice again"),
    ])
    .unwrap();

    assert_eq!(network.stats().count(NodeKindTag::Concat), 1);
    let root = network.root(TASK).unwrap();
    assert_eq!(network.nodes()[root.0].store_size, 2);
    let concat = network
        .nodes()
        .iter()
        .find(|n| n.kind.tag() == NodeKindTag::Concat)
        .unwrap();
    assert!(matches!(
        concat.kind,
        NodeKind::Concat {
            left_slot: 0,
            right_slot: 1
        }
    ));
    // Both scorers.
    assert_eq!(concat.store_size, 2);
}

#[test]
fn test_concat_keeps_origins_both_sides_agree_on() {
    let network = build(vec![Stream::for_each(TASK)
        .join(Stream::for_each(WORKER), [])
        .concat(Stream::for_each(TASK))
        .filter(Expr::gt(Expr::field(0, SIZE), Expr::int(1)))
        .penalize(SimpleScore::ONE)
        .as_constraint("Big either way")])
    .unwrap();
    assert!(network.observes(TASK, SIZE));
    assert!(!network.observes(TASK, LABEL));

    // Element 1 is a worker on one side and padding on the other.
    let network = build(vec![Stream::for_each(TASK)
        .join(Stream::for_each(WORKER), [])
        .concat(Stream::for_each(TASK))
        .filter(Expr::gt(Expr::field(1, CAPACITY), Expr::int(1)))
        .penalize(SimpleScore::ONE)
        .as_constraint("Strong worker")])
    .unwrap();
    assert!(network.observes(TASK, LABEL));
}
