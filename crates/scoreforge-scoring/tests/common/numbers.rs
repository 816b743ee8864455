//! Two classes of plain numbers, for exercising single nodes.

use std::sync::Arc;

use scoreforge_config::EngineConfig;
use scoreforge_core::{
    Fact, FactClassDescriptor, FieldDescriptor, FieldType, ParseableScore, Score,
    SolutionDescriptor, Value, WorkingSolution,
};
use scoreforge_scoring::{Constraint, Network, Session};

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;

pub const VALUE: usize = 0;
/// List field, on both classes.
pub const TAGS: usize = 1;

pub fn descriptor() -> Arc<SolutionDescriptor> {
    let mut descriptor = SolutionDescriptor::new("Numbers");
    for name in ["Left", "Right"] {
        descriptor
            .add_class(
                FactClassDescriptor::new(name)
                    .with_field(FieldDescriptor::new("value", FieldType::Int))
                    .with_field(FieldDescriptor::new("tags", FieldType::List)),
            )
            .unwrap();
    }
    Arc::new(descriptor)
}

pub fn number(class: usize, value: i64) -> Fact {
    tagged(class, value, &[])
}

pub fn tagged(class: usize, value: i64, tags: &[&str]) -> Fact {
    let tags = Value::list(tags.iter().map(|t| Value::str(t)));
    Fact::new(class, vec![Value::Int(value), tags])
}

/// An empty session scoring `constraints`.
pub fn session<Sc: Score>(constraints: Vec<Constraint<Sc>>) -> Session<Sc> {
    let descriptor = descriptor();
    let network = Network::build(descriptor.clone(), constraints).unwrap();
    Session::new(Arc::new(network), WorkingSolution::new(descriptor)).unwrap()
}

/// Like [`session`], with constraint matches kept for `explain`.
pub fn tracked_session<Sc: ParseableScore>(constraints: Vec<Constraint<Sc>>) -> Session<Sc> {
    let descriptor = descriptor();
    let network = Network::build(descriptor.clone(), constraints).unwrap();
    let config = EngineConfig::new().with_constraint_match_enabled(true);
    Session::with_config(Arc::new(network), WorkingSolution::new(descriptor), &config).unwrap()
}
