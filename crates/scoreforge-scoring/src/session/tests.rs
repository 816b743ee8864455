use std::sync::Arc;

use scoreforge_config::{EngineConfig, EnvironmentMode};
use scoreforge_core::{
    Expr, Fact, FactClassDescriptor, FieldDescriptor, FieldType, HardSoftScore, SimpleScore,
    SolutionDescriptor, Value, WorkingSolution,
};

use super::Session;
use crate::error::EngineError;
use crate::network::Network;
use crate::stream::{Constraint, Stream};

const ENTITY: usize = 0;
// Entity fields.
const GROUP: usize = 0;
const NOTE: usize = 1;
const SIZE: usize = 2;

fn descriptor() -> Arc<SolutionDescriptor> {
    let mut descriptor = SolutionDescriptor::new("Groups");
    descriptor
        .add_class(
            FactClassDescriptor::new("Entity")
                .with_field(FieldDescriptor::planning_variable("group", FieldType::Str))
                .with_field(FieldDescriptor::new("note", FieldType::Str))
                .with_field(FieldDescriptor::new("size", FieldType::Any)),
        )
        .unwrap();
    Arc::new(descriptor)
}

fn entity(group: Option<&str>, size: i64) -> Fact {
    let group = group.map_or(Value::None, Value::str);
    Fact::new(ENTITY, vec![group, Value::str(""), Value::Int(size)])
}

fn in_group_x() -> Stream {
    Stream::for_each(ENTITY).filter(Expr::eq(Expr::field(0, GROUP), Expr::literal("X")))
}

fn session<Sc: scoreforge_core::Score>(
    constraints: Vec<Constraint<Sc>>,
) -> (Session<Sc>, Arc<SolutionDescriptor>) {
    let descriptor = descriptor();
    let network = Arc::new(Network::build(descriptor.clone(), constraints).unwrap());
    let session = Session::new(network, WorkingSolution::new(descriptor.clone())).unwrap();
    (session, descriptor)
}

#[test]
fn test_group_membership_penalty_follows_changes() {
    let (mut session, _) =
        session(vec![in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")]);
    session.insert_fact(entity(Some("X"), 1)).unwrap();
    let e2 = session.insert_fact(entity(Some("Y"), 1)).unwrap();
    session.insert_fact(entity(Some("X"), 1)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));

    session.set_field(e2, GROUP, Value::str("X")).unwrap();
    assert_eq!(session.pending_events(), 1);
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-3));
}

#[test]
fn test_score_requires_flush() {
    let (mut session, _) =
        session(vec![in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")]);
    session.insert_fact(entity(Some("X"), 1)).unwrap();

    assert!(matches!(session.score(), Err(EngineError::PendingEvents(1))));
    session.flush().unwrap();
    assert_eq!(session.score().unwrap(), SimpleScore::of(-1));
}

#[test]
fn test_existing_facts_are_scored_on_creation() {
    let descriptor = descriptor();
    let mut solution = WorkingSolution::new(descriptor.clone());
    solution.insert(entity(Some("X"), 1)).unwrap();
    solution.insert(entity(Some("X"), 1)).unwrap();
    let network = Network::build(
        descriptor,
        [in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")],
    )
    .unwrap();

    let session = Session::new(Arc::new(network), solution).unwrap();
    assert_eq!(session.score().unwrap(), SimpleScore::of(-2));
}

#[test]
fn test_insert_then_retract_leaves_no_trace() {
    let (mut session, _) =
        session(vec![in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")]);
    session.insert_fact(entity(Some("X"), 1)).unwrap();
    let before = session.calculate_score().unwrap();
    let tuples = session.tuple_count();

    let id = session.insert_fact(entity(Some("X"), 1)).unwrap();
    session.retract_fact(id).unwrap();
    session.flush().unwrap();

    assert_eq!(session.score().unwrap(), before);
    assert_eq!(session.tuple_count(), tuples);
}

#[test]
fn test_retracted_fact_can_be_reinserted() {
    let (mut session, _) =
        session(vec![in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")]);
    let id = session.insert_fact(entity(Some("X"), 1)).unwrap();
    session.flush().unwrap();

    let fact = session.retract_fact(id).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
    assert!(session.solution().get(id).is_none());

    session.insert_fact(fact).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
}

#[test]
fn test_updates_to_unread_fields_are_dropped() {
    let (mut session, _) =
        session(vec![in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")]);
    let id = session.insert_fact(entity(Some("X"), 1)).unwrap();
    session.flush().unwrap();

    session.set_field(id, NOTE, Value::str("moved")).unwrap();
    assert_eq!(session.pending_events(), 0);

    session.update_fact(id, &[]).unwrap();
    assert_eq!(session.pending_events(), 1);
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
}

#[test]
fn test_unassigned_facts_are_excluded() {
    let (mut session, _) = session(vec![Stream::for_each(ENTITY)
        .penalize(SimpleScore::ONE)
        .as_constraint("Assigned")]);
    let id = session.insert_fact(entity(None, 1)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);

    session.set_field(id, GROUP, Value::str("Y")).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
}

#[test]
fn test_match_weight_scales_the_constraint_weight() {
    let (mut session, _) = session(vec![in_group_x()
        .penalize(HardSoftScore::ONE_SOFT)
        .with_match_weight(Expr::field(0, SIZE))
        .as_constraint("Size in X")]);
    let id = session.insert_fact(entity(Some("X"), 4)).unwrap();
    session.insert_fact(entity(Some("X"), 3)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), HardSoftScore::of(0, -7));

    session.set_field(id, SIZE, Value::Int(10)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), HardSoftScore::of(0, -13));
}

#[test]
fn test_set_constraint_weight_rescales_without_flush() {
    let (mut session, _) =
        session(vec![in_group_x().penalize(HardSoftScore::ONE_SOFT).as_constraint("In X")]);
    session.insert_fact(entity(Some("X"), 1)).unwrap();
    session.insert_fact(entity(Some("X"), 1)).unwrap();
    session.flush().unwrap();

    session
        .set_constraint_weight("In X", HardSoftScore::ONE_HARD)
        .unwrap();
    assert_eq!(session.score().unwrap(), HardSoftScore::of(-2, 0));
    assert_eq!(
        session.constraint_weight("In X"),
        Some(HardSoftScore::ONE_HARD)
    );

    let err = session
        .set_constraint_weight("Missing", HardSoftScore::ONE_HARD)
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownConstraint(name) if name == "Missing"));
}

#[test]
fn test_config_weight_overrides() {
    let descriptor = descriptor();
    let network = Arc::new(
        Network::build(
            descriptor.clone(),
            [in_group_x().penalize(HardSoftScore::ONE_SOFT).as_constraint("In X")],
        )
        .unwrap(),
    );
    let mut solution = WorkingSolution::new(descriptor);
    solution.insert(entity(Some("X"), 1)).unwrap();

    let config = EngineConfig::new().with_constraint_weight("In X", "2hard/0soft");
    let session = Session::with_config(network.clone(), solution.clone(), &config).unwrap();
    assert_eq!(session.score().unwrap(), HardSoftScore::of(-2, 0));

    let unknown = EngineConfig::new().with_constraint_weight("Nope", "1hard/0soft");
    assert!(matches!(
        Session::with_config(network.clone(), solution.clone(), &unknown),
        Err(EngineError::UnknownConstraint(_))
    ));

    let invalid = EngineConfig::new().with_constraint_weight("In X", "heavy");
    assert!(matches!(
        Session::with_config(network, solution, &invalid),
        Err(EngineError::InvalidWeight { .. })
    ));
}

#[test]
fn test_constraint_totals() {
    let (mut session, _) = session(vec![
        in_group_x().penalize(SimpleScore::ONE).as_constraint("In X"),
        Stream::for_each(ENTITY)
            .reward(SimpleScore::of(2))
            .as_constraint("Assigned"),
    ]);
    session.insert_fact(entity(Some("X"), 1)).unwrap();
    session.insert_fact(entity(Some("Y"), 1)).unwrap();
    session.flush().unwrap();

    let totals = session.constraint_totals().unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].constraint_ref.name, "In X");
    assert_eq!(totals[0].match_count, 1);
    assert_eq!(totals[0].score, SimpleScore::of(-1));
    assert_eq!(totals[1].match_count, 2);
    assert_eq!(totals[1].score, SimpleScore::of(4));
    assert_eq!(session.score().unwrap(), SimpleScore::of(3));
}

#[test]
fn test_explain_requires_match_tracking() {
    let (session, _) =
        session(vec![in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")]);
    assert!(matches!(
        session.explain(),
        Err(EngineError::ConstraintMatchDisabled)
    ));
}

#[test]
fn test_explain_and_indictments() {
    let descriptor = descriptor();
    let network = Arc::new(
        Network::build(
            descriptor.clone(),
            [in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")],
        )
        .unwrap(),
    );
    let config = EngineConfig::new().with_constraint_match_enabled(true);
    let mut session =
        Session::with_config(network, WorkingSolution::new(descriptor), &config).unwrap();
    let a = session.insert_fact(entity(Some("X"), 1)).unwrap();
    let b = session.insert_fact(entity(Some("X"), 1)).unwrap();
    session.insert_fact(entity(Some("Y"), 1)).unwrap();
    session.flush().unwrap();

    let explanation = session.explain().unwrap();
    assert_eq!(explanation.score, SimpleScore::of(-2));
    assert_eq!(explanation.total_match_count(), 2);
    let analysis = explanation.analysis("In X").unwrap();
    assert_eq!(analysis.match_count(), 2);
    assert!(analysis
        .matches
        .iter()
        .all(|m| m.score == SimpleScore::of(-1)));

    let indictments = session.indictments().unwrap();
    assert_eq!(indictments.len(), 2);
    assert_eq!(indictments.get(a).unwrap().score, SimpleScore::of(-1));
    assert!(indictments.get(b).is_some());

    session.retract_fact(a).unwrap();
    session.flush().unwrap();
    assert_eq!(session.explain().unwrap().total_match_count(), 1);
}

#[test]
fn test_evaluation_fault_poisons_the_session() {
    let (mut session, _) = session(vec![in_group_x()
        .penalize(SimpleScore::ONE)
        .with_match_weight(Expr::modulo(Expr::int(10), Expr::field(0, SIZE)))
        .as_constraint("Ratio")]);
    session.insert_fact(entity(Some("X"), 0)).unwrap();

    let err = session.flush().unwrap_err();
    assert!(matches!(err, EngineError::Evaluation { .. }));
    assert!(err.to_string().contains("Ratio"));
    assert!(session.is_poisoned());
    assert!(matches!(session.score(), Err(EngineError::Poisoned)));
    assert!(matches!(
        session.insert_fact(entity(Some("X"), 1)),
        Err(EngineError::Poisoned)
    ));
}

#[test]
fn test_domain_errors_do_not_poison() {
    let (mut session, _) =
        session(vec![in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")]);
    let bad = Fact::new(ENTITY, vec![Value::Int(3), Value::str(""), Value::Int(1)]);

    assert!(matches!(
        session.insert_fact(bad),
        Err(EngineError::Domain(_))
    ));
    assert!(!session.is_poisoned());
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
}

#[test]
fn test_full_assert_mode_checks_every_flush() {
    let descriptor = descriptor();
    let network = Arc::new(
        Network::build(
            descriptor.clone(),
            [in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")],
        )
        .unwrap(),
    );
    let config = EngineConfig::new().with_environment_mode(EnvironmentMode::FullAssert);
    let mut session =
        Session::with_config(network, WorkingSolution::new(descriptor), &config).unwrap();
    assert_eq!(session.environment_mode(), EnvironmentMode::FullAssert);

    let id = session.insert_fact(entity(Some("X"), 1)).unwrap();
    session.flush().unwrap();
    session.set_field(id, GROUP, Value::str("Y")).unwrap();
    session.flush().unwrap();
    assert_eq!(session.score().unwrap(), session.from_scratch_score().unwrap());
}

#[test]
fn test_solution_must_share_the_network_descriptor() {
    let network = Network::build(
        descriptor(),
        [in_group_x().penalize(SimpleScore::ONE).as_constraint("In X")],
    )
    .unwrap();
    let result = Session::new(Arc::new(network), WorkingSolution::new(descriptor()));
    assert!(matches!(result, Err(EngineError::Definition { .. })));
}
