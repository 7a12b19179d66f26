//! Property-based tests for scoring invariants
//!
//! These tests use proptest to verify the critical invariants:
//! - Deterministic replay: folding the ledger reproduces the aggregate
//! - Undo after N deliveries reproduces the aggregate after N−1
//! - Legal deliveries advance the over, illegal ones never do
//! - Strike rotates iff an odd number of runs were actually run

use chrono::Utc;
use proptest::prelude::*;
use scoring_core::engine;
use scoring_core::types::{
    DeliveryInput, Dismissal, DismissalKind, ExtraType, MatchAggregate, MatchInit, MatchStatus,
    PlayerId,
};
use scoring_core::DeliveryLedger;
use uuid::Uuid;

/// One generated ball: extra kind, runs, and an optional wicket
#[derive(Debug, Clone)]
struct BallCase {
    extra_kind: u8,
    runs: u32,
    wicket: bool,
    run_out_non_striker: bool,
}

fn ball_case_strategy() -> impl Strategy<Value = BallCase> {
    (0u8..5, 0u32..5, prop::bool::weighted(0.15), any::<bool>()).prop_map(
        |(extra_kind, runs, wicket, run_out_non_striker)| BallCase {
            extra_kind,
            runs,
            wicket,
            run_out_non_striker,
        },
    )
}

fn extra_type(kind: u8) -> ExtraType {
    match kind {
        1 => ExtraType::Wide,
        2 => ExtraType::NoBall,
        3 => ExtraType::Bye,
        4 => ExtraType::LegBye,
        _ => ExtraType::None,
    }
}

fn player(id: &str) -> PlayerId {
    PlayerId::new(id)
}

fn test_init() -> MatchInit {
    let mut squad: Vec<PlayerId> = (1..=11).map(|i| player(&format!("bat-{}", i))).collect();
    squad.push(player("bowl-1"));
    squad.push(player("bowl-2"));

    MatchInit {
        match_id: Uuid::now_v7(),
        overs_limit: 50,
        squad,
        opening_striker: player("bat-1"),
        opening_non_striker: player("bat-2"),
        opening_bowler: player("bowl-1"),
        started_at: Utc::now(),
    }
}

/// Drives a match the way a scorer would: resolves gates with
/// deterministic picks, scores through the engine, appends to the
/// ledger, and keeps the aggregate after every delivery.
struct Driver {
    ledger: DeliveryLedger,
    aggregate: MatchAggregate,
    after_each: Vec<MatchAggregate>,
}

impl Driver {
    fn new() -> Self {
        let ledger = DeliveryLedger::new(test_init()).unwrap();
        let aggregate = MatchAggregate::new(ledger.init());
        Self {
            ledger,
            aggregate,
            after_each: Vec::new(),
        }
    }

    fn next_batter(&self) -> Option<PlayerId> {
        (1..=11)
            .map(|i| player(&format!("bat-{}", i)))
            .find(|candidate| !self.aggregate.batting_scorecard.contains_key(candidate))
    }

    fn next_bowler(&self) -> PlayerId {
        if self.aggregate.last_ball_bowler == Some(player("bowl-1")) {
            player("bowl-2")
        } else {
            player("bowl-1")
        }
    }

    fn build_input(&self, case: &BallCase) -> DeliveryInput {
        let extra = extra_type(case.extra_kind);
        let bowler = self
            .aggregate
            .current_bowler
            .clone()
            .expect("gate resolution left a bowler in place");

        let dismissal = if case.wicket {
            let (kind, victim) = match extra {
                ExtraType::None => {
                    if case.run_out_non_striker {
                        (DismissalKind::RunOut, self.aggregate.current_non_striker.clone())
                    } else {
                        (DismissalKind::Bowled, self.aggregate.current_striker.clone())
                    }
                }
                ExtraType::Wide => (DismissalKind::Stumped, self.aggregate.current_striker.clone()),
                _ => {
                    let victim = if case.run_out_non_striker {
                        self.aggregate.current_non_striker.clone()
                    } else {
                        self.aggregate.current_striker.clone()
                    };
                    (DismissalKind::RunOut, victim)
                }
            };
            Some(Dismissal {
                kind,
                player: victim,
                fielder: None,
            })
        } else {
            None
        };

        let (runs_off_bat, extra_runs_run) = match extra {
            ExtraType::None | ExtraType::NoBall => (case.runs, 0),
            _ => (0, case.runs),
        };

        DeliveryInput {
            bowler,
            runs_off_bat,
            extra_type: extra,
            extra_runs_run,
            is_boundary: false,
            dismissal,
            timestamp: Utc::now(),
        }
    }

    /// Returns false once the innings can no longer continue
    fn step(&mut self, case: &BallCase) -> bool {
        if self.aggregate.status != MatchStatus::InProgress {
            return false;
        }
        if self.aggregate.gates.needs_new_batter {
            match self.next_batter() {
                Some(batter) => {
                    self.aggregate = engine::replace_batter(&self.aggregate, &batter).unwrap();
                }
                None => return false,
            }
        }
        if self.aggregate.gates.needs_new_over {
            let bowler = self.next_bowler();
            self.aggregate = engine::start_over(&self.aggregate, &bowler).unwrap();
        }

        let input = self.build_input(case);
        let (next, delivery) = engine::apply(&self.aggregate, &input).unwrap();
        self.ledger.append(delivery);
        self.aggregate = next;
        self.after_each.push(self.aggregate.clone());
        true
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: replaying the full ledger from the initial state always
    /// reproduces the aggregate that stood after the last delivery
    #[test]
    fn prop_replay_reproduces_aggregate(cases in prop::collection::vec(ball_case_strategy(), 1..60)) {
        let mut driver = Driver::new();
        for case in &cases {
            if !driver.step(case) {
                break;
            }
        }
        prop_assume!(!driver.after_each.is_empty());

        let replayed = driver.ledger.replay().unwrap();
        prop_assert_eq!(&replayed, driver.after_each.last().unwrap());
    }

    /// Property: undo after N deliveries reproduces the aggregate after
    /// N−1, for any mix of runs, extras and wickets
    #[test]
    fn prop_undo_restores_previous_state(cases in prop::collection::vec(ball_case_strategy(), 2..60)) {
        let mut driver = Driver::new();
        for case in &cases {
            if !driver.step(case) {
                break;
            }
        }
        let n = driver.after_each.len();
        prop_assume!(n >= 2);

        let (_, replayed) = driver.ledger.undo_last().unwrap();
        prop_assert_eq!(&replayed, &driver.after_each[n - 2]);
    }

    /// Property: undoing the only delivery restores the initial state
    #[test]
    fn prop_undo_single_delivery_restores_initial(case in ball_case_strategy()) {
        let mut driver = Driver::new();
        let initial = driver.aggregate.clone();
        prop_assume!(driver.step(&case));

        let (_, replayed) = driver.ledger.undo_last().unwrap();
        prop_assert_eq!(replayed, initial);
    }

    /// Property: legal deliveries advance balls_this_over by one and
    /// wrap to zero at six; wides and no-balls never advance it
    #[test]
    fn prop_over_arithmetic(cases in prop::collection::vec(ball_case_strategy(), 1..60)) {
        let mut driver = Driver::new();
        for case in &cases {
            let before = driver.aggregate.clone();
            if !driver.step(case) {
                break;
            }
            let after = &driver.aggregate;

            prop_assert!(after.balls_this_over < 6);
            if extra_type(case.extra_kind).is_legal() {
                if before.balls_this_over == 5 {
                    prop_assert_eq!(after.balls_this_over, 0);
                    prop_assert_eq!(after.overs_completed, before.overs_completed + 1);
                } else {
                    prop_assert_eq!(after.balls_this_over, before.balls_this_over + 1);
                    prop_assert_eq!(after.overs_completed, before.overs_completed);
                }
            } else {
                prop_assert_eq!(after.balls_this_over, before.balls_this_over);
                prop_assert_eq!(after.overs_completed, before.overs_completed);
            }
        }
    }

    /// Property: strike rotates iff an odd number of runs were actually
    /// run, independent of any automatic penalty (single delivery, so
    /// the end-of-over swap cannot interfere)
    #[test]
    fn prop_rotation_parity(extra_kind in 0u8..5, runs in 0u32..5) {
        let ledger = DeliveryLedger::new(test_init()).unwrap();
        let aggregate = MatchAggregate::new(ledger.init());
        let extra = extra_type(extra_kind);

        let (runs_off_bat, extra_runs_run) = match extra {
            ExtraType::None | ExtraType::NoBall => (runs, 0),
            _ => (0, runs),
        };
        let input = DeliveryInput {
            bowler: player("bowl-1"),
            runs_off_bat,
            extra_type: extra,
            extra_runs_run,
            is_boundary: false,
            dismissal: None,
            timestamp: Utc::now(),
        };

        let (next, delivery) = engine::apply(&aggregate, &input).unwrap();
        let rotated = next.current_striker == aggregate.current_non_striker;
        prop_assert_eq!(rotated, delivery.runs_taken() % 2 == 1);
        // The automatic penalty never counts as a run taken
        prop_assert_eq!(delivery.runs_taken(), runs);
    }

    /// Property: the innings total always equals the sum of runs
    /// contributed by the ledger entries of the current innings
    #[test]
    fn prop_total_runs_is_ledger_sum(cases in prop::collection::vec(ball_case_strategy(), 1..60)) {
        let mut driver = Driver::new();
        for case in &cases {
            if !driver.step(case) {
                break;
            }
        }
        prop_assume!(!driver.after_each.is_empty());

        let final_state = driver.after_each.last().unwrap();
        let ledger_sum: u32 = driver
            .ledger
            .entries()
            .iter()
            .filter(|d| d.inning == final_state.current_inning)
            .map(|d| d.total_runs())
            .sum();
        prop_assert_eq!(final_state.total_runs, ledger_sum);
    }
}

#[test]
fn undo_on_empty_ledger_never_mutates() {
    let mut ledger = DeliveryLedger::new(test_init()).unwrap();
    for _ in 0..3 {
        assert!(ledger.undo_last().unwrap_err().is_conflict());
        assert!(ledger.is_empty());
    }
}
