mod common;

use common::numbers::{self, number, LEFT, RIGHT, VALUE};
use scoreforge_core::{Expr, SimpleScore, Value};
use scoreforge_scoring::joiner::{equal, filtering};
use scoreforge_scoring::{Session, Stream};

fn gated(should_exist: bool) -> Session<SimpleScore> {
    let left = Stream::for_each(LEFT);
    let right = Stream::for_each(RIGHT);
    let joiners = [equal(Expr::field(0, VALUE), Expr::field(0, VALUE))];
    let stream = if should_exist {
        left.if_exists(right, joiners)
    } else {
        left.if_not_exists(right, joiners)
    };
    numbers::session(vec![stream.penalize(SimpleScore::ONE).as_constraint("Gate")])
}

#[test]
fn if_exists_flips_only_at_the_first_and_last_match() {
    let mut session = gated(true);
    session.insert_fact(number(LEFT, 1)).unwrap();
    session.insert_fact(number(LEFT, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);

    let first = session.insert_fact(number(RIGHT, 1)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    let second = session.insert_fact(number(RIGHT, 1)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.retract_fact(first).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.retract_fact(second).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
}

#[test]
fn if_not_exists_is_the_complement() {
    let mut session = gated(false);
    session.insert_fact(number(LEFT, 1)).unwrap();
    session.insert_fact(number(LEFT, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));

    let blocker = session.insert_fact(number(RIGHT, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.set_field(blocker, VALUE, Value::Int(1)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.set_field(blocker, VALUE, Value::Int(3)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));
}

#[test]
fn left_key_change_rechecks_the_gate() {
    let mut session = gated(true);
    let l = session.insert_fact(number(LEFT, 1)).unwrap();
    session.insert_fact(number(RIGHT, 5)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);

    session.set_field(l, VALUE, Value::Int(5)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.retract_fact(l).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
}

#[test]
fn same_batch_insert_and_retract_leave_the_gate_closed() {
    let mut session = gated(true);
    session.insert_fact(number(LEFT, 4)).unwrap();
    session.flush().unwrap();

    let transient = session.insert_fact(number(RIGHT, 4)).unwrap();
    session.retract_fact(transient).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
}

#[test]
fn residual_joiner_filters_candidates() {
    // Some right fact with the same value and a strictly larger tag list.
    let joiners = [
        equal(Expr::field(0, VALUE), Expr::field(0, VALUE)),
        filtering(Expr::gt(
            Expr::len(Expr::field(1, numbers::TAGS)),
            Expr::len(Expr::field(0, numbers::TAGS)),
        )),
    ];
    let mut session = numbers::session(vec![Stream::for_each(LEFT)
        .if_exists(Stream::for_each(RIGHT), joiners)
        .penalize(SimpleScore::ONE)
        .as_constraint("Outranked")]);
    session.insert_fact(numbers::tagged(LEFT, 1, &["a"])).unwrap();
    let right = session.insert_fact(numbers::tagged(RIGHT, 1, &["a"])).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);

    let tags = Value::list([Value::str("a"), Value::str("b")]);
    session.set_field(right, numbers::TAGS, tags).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
    assert_eq!(session.calculate_score().unwrap(), session.from_scratch_score().unwrap());
}
