//! Scheduling constraints and helpers shared by the integration tests.

#![allow(dead_code)]

pub mod numbers;

use std::sync::Arc;

use scoreforge_core::{Expr, FactId, HardSoftScore, SolutionDescriptor, WorkingSolution};
use scoreforge_scoring::joiner::{equal, less_than, overlapping};
use scoreforge_scoring::{collector, Constraint, Network, Session, Stream};
use scoreforge_test::scheduling::{self, ASSIGNEE, END, REQUIRED_SKILL, SHIFT, SKILLS, START};
use scoreforge_test::{field_writes, ShiftMove};

/// Assigned shifts whose employee lacks the required skill, one hard each.
pub fn missing_skill() -> Constraint<HardSoftScore> {
    let employee_skills = Expr::ref_field(Expr::field(0, ASSIGNEE), SKILLS);
    Stream::for_each(SHIFT)
        .filter(!Expr::contains(employee_skills, Expr::field(0, REQUIRED_SKILL)))
        .penalize(HardSoftScore::ONE_HARD)
        .as_constraint("Missing skill")
}

/// Overlapping shifts of one employee, one hard per overlapping minute.
pub fn overlapping_shifts() -> Constraint<HardSoftScore> {
    let overlap = Expr::min(Expr::field(0, END), Expr::field(1, END))
        - Expr::max(Expr::field(0, START), Expr::field(1, START));
    Stream::for_each(SHIFT)
        .join(
            Stream::for_each(SHIFT),
            [
                equal(Expr::field(0, ASSIGNEE), Expr::field(0, ASSIGNEE)),
                less_than(Expr::element(0), Expr::element(0)),
                overlapping(
                    Expr::field(0, START),
                    Expr::field(0, END),
                    Expr::field(0, START),
                    Expr::field(0, END),
                ),
            ],
        )
        .penalize(HardSoftScore::ONE_HARD)
        .with_match_weight(overlap)
        .as_constraint("Overlapping shifts")
}

/// Squared shift count per employee, in soft.
pub fn balanced_load() -> Constraint<HardSoftScore> {
    Stream::for_each(SHIFT)
        .group_by([Expr::field(0, ASSIGNEE)], [collector::count()])
        .penalize(HardSoftScore::ONE_SOFT)
        .with_match_weight(Expr::element(1) * Expr::element(1))
        .as_constraint("Balanced load")
}

pub fn constraints() -> Vec<Constraint<HardSoftScore>> {
    vec![missing_skill(), overlapping_shifts(), balanced_load()]
}

pub fn network(descriptor: Arc<SolutionDescriptor>) -> Arc<Network<HardSoftScore>> {
    Arc::new(Network::build(descriptor, constraints()).unwrap())
}

/// The score [`constraints`] should produce, computed directly.
pub fn expected_score(solution: &WorkingSolution) -> HardSoftScore {
    let hard = scheduling::missing_skill_count(solution) + scheduling::overlap_minutes(solution);
    let soft: i64 = scheduling::shift_counts(solution)
        .iter()
        .map(|(_, n)| n * n)
        .sum();
    HardSoftScore::of(-hard, -soft)
}

/// Applies a move through the session, keeping `live` in step.
pub fn apply(
    session: &mut Session<HardSoftScore>,
    live: &mut Vec<FactId>,
    shift_move: &ShiftMove,
) {
    match shift_move {
        ShiftMove::Assign { shift: fact, .. }
        | ShiftMove::Reschedule { shift: fact, .. }
        | ShiftMove::Reskill { employee: fact, .. } => {
            for (field, value) in field_writes(shift_move) {
                session.set_field(*fact, field, value).unwrap();
            }
        }
        ShiftMove::Add {
            day,
            start,
            end,
            skill,
            employee,
        } => {
            let fact = scheduling::shift(*day, *start, *end, skill, *employee);
            live.push(session.insert_fact(fact).unwrap());
        }
        ShiftMove::Remove { shift } => {
            session.retract_fact(*shift).unwrap();
            live.retain(|id| id != shift);
        }
    }
}
