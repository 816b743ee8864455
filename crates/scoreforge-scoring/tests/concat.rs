//! Concatenation, and the operations written in terms of it or of groups
//! and maps: distinct, expand, complement and the `*_other` gates.

mod common;

use common::numbers::{self, number, LEFT, RIGHT, VALUE};
use scoreforge_core::{Expr, SimpleScore, Value};
use scoreforge_scoring::joiner::equal;
use scoreforge_scoring::{NodeKindTag, Stream};

fn same_value() -> [scoreforge_scoring::Joiner; 1] {
    [equal(Expr::field(0, VALUE), Expr::field(0, VALUE))]
}

#[test]
fn concat_keeps_tuples_of_both_sides() {
    let small_right = Stream::for_each(RIGHT).filter(Expr::lt(Expr::field(0, VALUE), Expr::int(10)));
    let mut session = numbers::session(vec![Stream::for_each(LEFT)
        .concat(small_right)
        .penalize(SimpleScore::ONE)
        .with_match_weight(Expr::field(0, VALUE))
        .as_constraint("Union")]);
    let a = session.insert_fact(number(LEFT, 1)).unwrap();
    let b = session.insert_fact(number(RIGHT, 4)).unwrap();
    session.insert_fact(number(RIGHT, 20)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-5));

    session.set_field(b, VALUE, Value::Int(12)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.set_field(a, VALUE, Value::Int(3)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-3));

    session.retract_fact(a).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
    assert_eq!(session.tuple_count(), 2);
}

#[test]
fn concat_with_itself_keeps_duplicates() {
    let left = Stream::for_each(LEFT);
    let mut session = numbers::session(vec![left
        .clone()
        .concat(left)
        .penalize(SimpleScore::ONE)
        .as_constraint("Twice")]);
    assert_eq!(session.network().stats().count(NodeKindTag::Concat), 1);

    let a = session.insert_fact(number(LEFT, 1)).unwrap();
    session.insert_fact(number(LEFT, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-4));

    session.retract_fact(a).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));
    assert_eq!(session.score().unwrap(), session.from_scratch_score().unwrap());
}

#[test]
fn shorter_side_is_padded_with_none() {
    let pairs = Stream::for_each(LEFT).join(Stream::for_each(RIGHT), same_value());
    let mixed = pairs.concat(Stream::for_each(LEFT));
    assert_eq!(mixed.arity(), 2);
    let mut session = numbers::session(vec![
        mixed
            .clone()
            .filter(Expr::is_none(Expr::element(1)))
            .penalize(SimpleScore::ONE)
            .as_constraint("Padded"),
        mixed
            .filter(Expr::is_not_none(Expr::element(1)))
            .penalize(SimpleScore::of(10))
            .as_constraint("Joined"),
    ]);
    session.insert_fact(number(LEFT, 1)).unwrap();
    session.insert_fact(number(LEFT, 2)).unwrap();
    let right = session.insert_fact(number(RIGHT, 1)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-12));

    session.set_field(right, VALUE, Value::Int(2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-12));

    session.retract_fact(right).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));
}

#[test]
fn distinct_counts_each_row_once() {
    let mut session = numbers::session(vec![Stream::for_each(LEFT)
        .map([Expr::field(0, VALUE)])
        .distinct()
        .penalize(SimpleScore::ONE)
        .with_match_weight(Expr::element(0))
        .as_constraint("Distinct values")]);
    let a = session.insert_fact(number(LEFT, 2)).unwrap();
    let b = session.insert_fact(number(LEFT, 2)).unwrap();
    let c = session.insert_fact(number(LEFT, 3)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-5));

    session.retract_fact(a).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-5));

    session.set_field(b, VALUE, Value::Int(3)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-3));

    session.set_field(c, VALUE, Value::Int(7)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-10));
}

#[test]
fn expand_appends_computed_elements() {
    let doubled = Stream::for_each(LEFT).expand([Expr::field(0, VALUE) * Expr::int(2)]);
    assert_eq!(doubled.arity(), 2);
    let mut session = numbers::session(vec![doubled
        .filter(Expr::gt(Expr::element(1), Expr::int(5)))
        .penalize(SimpleScore::ONE)
        .with_match_weight(Expr::element(1))
        .as_constraint("Doubled")]);
    let a = session.insert_fact(number(LEFT, 1)).unwrap();
    session.insert_fact(number(LEFT, 3)).unwrap();
    session.insert_fact(number(LEFT, 4)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-14));

    session.set_field(a, VALUE, Value::Int(10)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-34));
}

#[test]
fn complement_adds_the_missing_facts() {
    let pairs = Stream::for_each(LEFT).join(Stream::for_each(RIGHT), same_value());
    let mut session = numbers::session(vec![pairs
        .complement(LEFT)
        .filter(Expr::is_none(Expr::element(1)))
        .penalize(SimpleScore::ONE)
        .as_constraint("Unpaired")]);
    session.insert_fact(number(LEFT, 1)).unwrap();
    session.insert_fact(number(LEFT, 2)).unwrap();
    let r1 = session.insert_fact(number(RIGHT, 1)).unwrap();
    let r2 = session.insert_fact(number(RIGHT, 1)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.retract_fact(r1).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));

    session.retract_fact(r2).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));

    session.insert_fact(number(RIGHT, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
    assert_eq!(session.score().unwrap(), session.from_scratch_score().unwrap());
}

#[test]
fn other_gates_ignore_the_tuple_itself() {
    let mut session = numbers::session(vec![
        Stream::for_each(LEFT)
            .if_exists_other(LEFT, same_value())
            .penalize(SimpleScore::ONE)
            .as_constraint("Shared value"),
        Stream::for_each(LEFT)
            .if_not_exists_other(LEFT, same_value())
            .penalize(SimpleScore::of(10))
            .as_constraint("Unique value"),
    ]);
    let a = session.insert_fact(number(LEFT, 1)).unwrap();
    let b = session.insert_fact(number(LEFT, 1)).unwrap();
    let c = session.insert_fact(number(LEFT, 2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-12));

    session.set_field(b, VALUE, Value::Int(2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-12));

    session.set_field(a, VALUE, Value::Int(2)).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-3));

    session.retract_fact(c).unwrap();
    assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-2));
}
