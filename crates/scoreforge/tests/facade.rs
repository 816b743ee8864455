//! End-to-end use of the facade: configuration, sessions and analysis.

use std::sync::Arc;

use scoreforge::prelude::*;
use scoreforge::{logging, EnvironmentMode};

const ROOM: usize = 0;
const INSTRUCTOR: usize = 1;

fn timetable() -> (Arc<SolutionDescriptor>, usize) {
    let mut descriptor = SolutionDescriptor::new("Timetable");
    let lesson = descriptor
        .add_class(
            FactClassDescriptor::new("Lesson")
                .with_field(FieldDescriptor::planning_variable("room", FieldType::Str))
                .with_field(FieldDescriptor::new("instructor", FieldType::Str)),
        )
        .unwrap();
    (Arc::new(descriptor), lesson)
}

fn room_conflict(lesson: usize) -> scoreforge::Constraint<HardSoftScore> {
    Stream::for_each(lesson)
        .join(
            Stream::for_each(lesson),
            [
                joiner::equal(Expr::field(0, ROOM), Expr::field(0, ROOM)),
                joiner::less_than(Expr::element(0), Expr::element(0)),
            ],
        )
        .penalize(HardSoftScore::ONE_HARD)
        .as_constraint("Room conflict")
}

#[test]
fn logging_init_is_idempotent() {
    logging::init();
    logging::init();
    tracing::info!(event = "facade_test", "logging installed");
}

#[test]
fn configured_session_explains_its_score() {
    let (descriptor, lesson) = timetable();
    let network = Arc::new(Network::build(descriptor.clone(), [room_conflict(lesson)]).unwrap());
    let config = EngineConfig::from_toml_str(
        r#"
        environment_mode = "fast_assert"
        constraint_match_enabled = true

        [constraint_weights]
        "Room conflict" = "2hard/0soft"
        "#,
    )
    .unwrap();

    let mut session =
        Session::with_config(network, WorkingSolution::new(descriptor), &config).unwrap();
    assert_eq!(session.environment_mode(), EnvironmentMode::FastAssert);

    let mut lessons = Vec::new();
    for instructor in ["Ada", "Bo", "Cy"] {
        let fact = Fact::new(lesson, vec![Value::str("A1"), Value::str(instructor)]);
        lessons.push(session.insert_fact(fact).unwrap());
    }
    assert_eq!(session.calculate_score().unwrap(), HardSoftScore::of(-6, 0));

    let explanation = session.explain().unwrap();
    assert_eq!(explanation.score, HardSoftScore::of(-6, 0));
    let analysis = explanation.analysis("Room conflict").unwrap();
    assert_eq!(analysis.match_count(), 3);
    assert!(analysis.is_hard);

    let indictments = session.indictments().unwrap();
    assert_eq!(indictments.len(), 3);
    assert_eq!(indictments.get(lessons[0]).unwrap().match_count(), 2);

    session.set_field(lessons[0], ROOM, Value::str("B2")).unwrap();
    session.set_field(lessons[1], INSTRUCTOR, Value::str("Di")).unwrap();
    assert_eq!(session.calculate_score().unwrap(), HardSoftScore::of(-2, 0));
}

#[test]
fn simple_director_scores_from_scratch() {
    let (descriptor, lesson) = timetable();
    let network = Arc::new(Network::build(descriptor.clone(), [room_conflict(lesson)]).unwrap());
    let mut solution = WorkingSolution::new(descriptor);
    let first = solution
        .insert(Fact::new(lesson, vec![Value::str("A1"), Value::str("Ada")]))
        .unwrap();
    solution
        .insert(Fact::new(lesson, vec![Value::str("A1"), Value::str("Bo")]))
        .unwrap();

    let mut director = scoreforge::SimpleScoreDirector::new(network, solution);
    assert!(!director.is_incremental());
    assert_eq!(director.calculate_score().unwrap(), HardSoftScore::of(-1, 0));

    director
        .change_variable(first, ROOM, Value::str("B2"))
        .unwrap();
    assert_eq!(director.calculate_score().unwrap(), HardSoftScore::ZERO);
}
