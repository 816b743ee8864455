//! One immutable network shared by sessions on several threads.

mod common;

use std::sync::Arc;

use rayon::prelude::*;

use scoreforge_core::HardSoftScore;
use scoreforge_scoring::{Network, Session};
use scoreforge_test::scheduling;
use scoreforge_test::ScheduleGenerator;

fn assert_send_sync<T: Send + Sync>() {}

fn assert_send<T: Send>() {}

#[test]
fn network_is_shareable() {
    assert_send_sync::<Network<HardSoftScore>>();
    assert_send::<Session<HardSoftScore>>();
}

#[test]
fn sessions_on_a_shared_network_score_independently() {
    let descriptor = scheduling::descriptor();
    let network = common::network(descriptor.clone());

    let results: Vec<_> = (0..8u64)
        .into_par_iter()
        .map(|seed| {
            let mut generator = ScheduleGenerator::new(seed);
            let schedule = generator.schedule_for(descriptor.clone(), 4, 15);
            let mut session =
                Session::new(Arc::clone(&network), schedule.solution.clone()).unwrap();
            let mut live = schedule.shifts.clone();
            for _ in 0..50 {
                let shift_move = generator.next_move(&schedule, &live);
                common::apply(&mut session, &mut live, &shift_move);
            }
            let score = session.calculate_score().unwrap();
            (seed, score, common::expected_score(session.solution()))
        })
        .collect();

    assert_eq!(results.len(), 8);
    for (seed, score, expected) in results {
        assert_eq!(score, expected, "seed {}", seed);
    }
    assert_eq!(Arc::strong_count(&network), 1);
}
