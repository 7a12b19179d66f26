//! Incremental aggregate deltas for the real-time channel
//!
//! A delta carries one optional slot per broadcast-relevant aggregate
//! field plus the per-match mutation sequence number. Merging is
//! idempotent field-by-field (the later sequence wins), so a client
//! that missed one update still reconciles correctly from the next,
//! or falls back to a full snapshot.

use crate::types::{
    BattingLine, BowlingLine, Extras, Gates, MatchAggregate, MatchResult, MatchSnapshot,
    MatchStatus, PlayerId, ScoringPhase,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Field-wise diff between two aggregates of the same match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDelta {
    /// Match ID
    pub match_id: Uuid,

    /// Mutation sequence this delta produced
    pub seq: u64,

    /// Innings total
    pub total_runs: Option<u32>,

    /// Wickets down
    pub total_wickets: Option<u8>,

    /// Completed overs
    pub overs_completed: Option<u16>,

    /// Legal balls in the over in progress
    pub balls_this_over: Option<u8>,

    /// Current innings
    pub current_inning: Option<u8>,

    /// Batter on strike
    pub current_striker: Option<PlayerId>,

    /// Batter at the non-striker's end
    pub current_non_striker: Option<PlayerId>,

    /// Bowler of the over in progress (inner None while gated)
    pub current_bowler: Option<Option<PlayerId>>,

    /// Bowler barred from the next over
    pub last_ball_bowler: Option<Option<PlayerId>>,

    /// Lifecycle status
    pub status: Option<MatchStatus>,

    /// Server-authoritative phase
    pub phase: Option<ScoringPhase>,

    /// Chase target
    pub target: Option<Option<u32>>,

    /// Extras breakdown
    pub extras: Option<Extras>,

    /// Pending gates
    pub gates: Option<Gates>,

    /// Result once completed
    pub result: Option<Option<MatchResult>>,

    /// Batting lines that changed
    pub batting_lines: HashMap<PlayerId, BattingLine>,

    /// Bowling lines that changed
    pub bowling_lines: HashMap<PlayerId, BowlingLine>,

    /// Timestamp of the mutation
    pub updated_at: Option<DateTime<Utc>>,
}

impl AggregateDelta {
    /// Empty delta for a mutation sequence
    pub fn empty(match_id: Uuid, seq: u64) -> Self {
        Self {
            match_id,
            seq,
            total_runs: None,
            total_wickets: None,
            overs_completed: None,
            balls_this_over: None,
            current_inning: None,
            current_striker: None,
            current_non_striker: None,
            current_bowler: None,
            last_ball_bowler: None,
            status: None,
            phase: None,
            target: None,
            extras: None,
            gates: None,
            result: None,
            batting_lines: HashMap::new(),
            bowling_lines: HashMap::new(),
            updated_at: None,
        }
    }

    /// Diff two aggregates of the same match
    pub fn diff(old: &MatchAggregate, new: &MatchAggregate, seq: u64) -> Self {
        fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
            (old != new).then(|| new.clone())
        }

        let mut delta = Self::empty(new.match_id, seq);
        delta.total_runs = changed(&old.total_runs, &new.total_runs);
        delta.total_wickets = changed(&old.total_wickets, &new.total_wickets);
        delta.overs_completed = changed(&old.overs_completed, &new.overs_completed);
        delta.balls_this_over = changed(&old.balls_this_over, &new.balls_this_over);
        delta.current_inning = changed(&old.current_inning, &new.current_inning);
        delta.current_striker = changed(&old.current_striker, &new.current_striker);
        delta.current_non_striker = changed(&old.current_non_striker, &new.current_non_striker);
        delta.current_bowler = changed(&old.current_bowler, &new.current_bowler);
        delta.last_ball_bowler = changed(&old.last_ball_bowler, &new.last_ball_bowler);
        delta.status = changed(&old.status, &new.status);
        delta.phase = changed(&old.phase, &new.phase);
        delta.target = changed(&old.target, &new.target);
        delta.extras = changed(&old.extras, &new.extras);
        delta.gates = changed(&old.gates, &new.gates);
        delta.result = changed(&old.result, &new.result);
        delta.updated_at = changed(&old.updated_at, &new.updated_at);

        for (player, line) in &new.batting_scorecard {
            if old.batting_scorecard.get(player) != Some(line) {
                delta.batting_lines.insert(player.clone(), line.clone());
            }
        }
        for (player, line) in &new.bowling_scorecard {
            if old.bowling_scorecard.get(player) != Some(line) {
                delta.bowling_lines.insert(player.clone(), line.clone());
            }
        }

        delta
    }

    /// Whether the delta carries no changes
    pub fn is_empty(&self) -> bool {
        let Self {
            match_id: _,
            seq: _,
            total_runs,
            total_wickets,
            overs_completed,
            balls_this_over,
            current_inning,
            current_striker,
            current_non_striker,
            current_bowler,
            last_ball_bowler,
            status,
            phase,
            target,
            extras,
            gates,
            result,
            batting_lines,
            bowling_lines,
            updated_at,
        } = self;
        total_runs.is_none()
            && total_wickets.is_none()
            && overs_completed.is_none()
            && balls_this_over.is_none()
            && current_inning.is_none()
            && current_striker.is_none()
            && current_non_striker.is_none()
            && current_bowler.is_none()
            && last_ball_bowler.is_none()
            && status.is_none()
            && phase.is_none()
            && target.is_none()
            && extras.is_none()
            && gates.is_none()
            && result.is_none()
            && batting_lines.is_empty()
            && bowling_lines.is_empty()
            && updated_at.is_none()
    }

    /// Merge another delta into this one, field by field.
    ///
    /// The later sequence wins on conflicting fields; merging the same
    /// delta twice is a no-op, and merge order does not affect the
    /// converged value.
    pub fn merge(&mut self, other: &AggregateDelta) {
        let other_is_newer = other.seq >= self.seq;

        fn pick<T: Clone>(mine: &mut Option<T>, theirs: &Option<T>, theirs_newer: bool) {
            if theirs.is_some() && (theirs_newer || mine.is_none()) {
                *mine = theirs.clone();
            }
        }

        pick(&mut self.total_runs, &other.total_runs, other_is_newer);
        pick(&mut self.total_wickets, &other.total_wickets, other_is_newer);
        pick(&mut self.overs_completed, &other.overs_completed, other_is_newer);
        pick(&mut self.balls_this_over, &other.balls_this_over, other_is_newer);
        pick(&mut self.current_inning, &other.current_inning, other_is_newer);
        pick(&mut self.current_striker, &other.current_striker, other_is_newer);
        pick(
            &mut self.current_non_striker,
            &other.current_non_striker,
            other_is_newer,
        );
        pick(&mut self.current_bowler, &other.current_bowler, other_is_newer);
        pick(
            &mut self.last_ball_bowler,
            &other.last_ball_bowler,
            other_is_newer,
        );
        pick(&mut self.status, &other.status, other_is_newer);
        pick(&mut self.phase, &other.phase, other_is_newer);
        pick(&mut self.target, &other.target, other_is_newer);
        pick(&mut self.extras, &other.extras, other_is_newer);
        pick(&mut self.gates, &other.gates, other_is_newer);
        pick(&mut self.result, &other.result, other_is_newer);
        pick(&mut self.updated_at, &other.updated_at, other_is_newer);

        for (player, line) in &other.batting_lines {
            if other_is_newer || !self.batting_lines.contains_key(player) {
                self.batting_lines.insert(player.clone(), line.clone());
            }
        }
        for (player, line) in &other.bowling_lines {
            if other_is_newer || !self.bowling_lines.contains_key(player) {
                self.bowling_lines.insert(player.clone(), line.clone());
            }
        }

        self.seq = self.seq.max(other.seq);
    }

    /// Apply the delta onto a client-held snapshot
    pub fn apply_to(&self, snapshot: &mut MatchSnapshot) {
        let aggregate = &mut snapshot.aggregate;

        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        set(&mut aggregate.total_runs, &self.total_runs);
        set(&mut aggregate.total_wickets, &self.total_wickets);
        set(&mut aggregate.overs_completed, &self.overs_completed);
        set(&mut aggregate.balls_this_over, &self.balls_this_over);
        set(&mut aggregate.current_inning, &self.current_inning);
        set(&mut aggregate.current_striker, &self.current_striker);
        set(&mut aggregate.current_non_striker, &self.current_non_striker);
        set(&mut aggregate.current_bowler, &self.current_bowler);
        set(&mut aggregate.last_ball_bowler, &self.last_ball_bowler);
        set(&mut aggregate.status, &self.status);
        set(&mut aggregate.phase, &self.phase);
        set(&mut aggregate.target, &self.target);
        set(&mut aggregate.extras, &self.extras);
        set(&mut aggregate.gates, &self.gates);
        set(&mut aggregate.result, &self.result);
        set(&mut aggregate.updated_at, &self.updated_at);

        for (player, line) in &self.batting_lines {
            aggregate
                .batting_scorecard
                .insert(player.clone(), line.clone());
        }
        for (player, line) in &self.bowling_lines {
            aggregate
                .bowling_scorecard
                .insert(player.clone(), line.clone());
        }

        snapshot.seq = snapshot.seq.max(self.seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::apply;
    use crate::types::{DeliveryInput, ExtraType, MatchInit};

    fn player(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn aggregates() -> (MatchAggregate, MatchAggregate) {
        let init = MatchInit {
            match_id: Uuid::now_v7(),
            overs_limit: 20,
            squad: vec![player("s"), player("n"), player("b")],
            opening_striker: player("s"),
            opening_non_striker: player("n"),
            opening_bowler: player("b"),
            started_at: Utc::now(),
        };
        let old = MatchAggregate::new(&init);
        let input = DeliveryInput {
            bowler: player("b"),
            runs_off_bat: 1,
            extra_type: ExtraType::None,
            extra_runs_run: 0,
            is_boundary: false,
            dismissal: None,
            timestamp: Utc::now(),
        };
        let (new, _) = apply(&old, &input).unwrap();
        (old, new)
    }

    #[test]
    fn test_diff_picks_changed_fields_only() {
        let (old, new) = aggregates();
        let delta = AggregateDelta::diff(&old, &new, 1);

        assert_eq!(delta.total_runs, Some(1));
        assert_eq!(delta.balls_this_over, Some(1));
        // Strike rotated on the single
        assert_eq!(delta.current_striker, Some(player("n")));
        // Unchanged fields stay empty
        assert_eq!(delta.total_wickets, None);
        assert_eq!(delta.status, None);
        assert_eq!(delta.batting_lines.len(), 1);
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_diff_of_identical_aggregates_is_empty() {
        let (old, _) = aggregates();
        let delta = AggregateDelta::diff(&old, &old.clone(), 1);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (old, new) = aggregates();
        let delta = AggregateDelta::diff(&old, &new, 3);

        let mut merged = delta.clone();
        merged.merge(&delta);
        assert_eq!(merged, delta);
    }

    #[test]
    fn test_merge_converges_regardless_of_order() {
        let (old, new) = aggregates();
        let first = AggregateDelta::diff(&old, &new, 1);
        let mut second = AggregateDelta::empty(new.match_id, 2);
        second.total_runs = Some(5);

        let mut forward = first.clone();
        forward.merge(&second);
        let mut backward = second.clone();
        backward.merge(&first);

        assert_eq!(forward.total_runs, Some(5));
        assert_eq!(backward.total_runs, Some(5));
        assert_eq!(forward.seq, 2);
        assert_eq!(backward.seq, 2);
        assert_eq!(forward.current_striker, backward.current_striker);
    }

    #[test]
    fn test_apply_to_reconciles_snapshot() {
        let (old, new) = aggregates();
        let delta = AggregateDelta::diff(&old, &new, 1);

        let mut snapshot = MatchSnapshot {
            seq: 0,
            aggregate: old,
        };
        delta.apply_to(&mut snapshot);

        assert_eq!(snapshot.seq, 1);
        assert_eq!(snapshot.aggregate.total_runs, new.total_runs);
        assert_eq!(snapshot.aggregate.current_striker, new.current_striker);
        assert_eq!(
            snapshot.aggregate.batting_scorecard[&player("s")],
            new.batting_scorecard[&player("s")]
        );
    }
}
