//! Core types for the scoring engine
//!
//! All types are designed for:
//! - Deterministic replay (the aggregate is a pure fold of the ledger)
//! - Serializable snapshots (serde, JSON map keys are plain strings)
//! - Functional update (the engine returns whole new values)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Player identifier (registration number, shirt tag, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create new player ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extra classification for one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraType {
    /// Normal delivery, no extras
    None,
    /// Wide: illegal, 1 automatic run plus any runs actually run
    Wide,
    /// No-ball: illegal, 1 automatic penalty; bat runs still credited
    NoBall,
    /// Bye: legal, runs not credited to the batter
    Bye,
    /// Leg bye: legal, runs off the body, not credited to the batter
    LegBye,
}

impl ExtraType {
    /// Legal deliveries advance the over; wides and no-balls do not
    pub fn is_legal(&self) -> bool {
        !matches!(self, ExtraType::Wide | ExtraType::NoBall)
    }

    /// Automatic penalty run awarded regardless of running
    pub fn automatic_runs(&self) -> u32 {
        match self {
            ExtraType::Wide | ExtraType::NoBall => 1,
            _ => 0,
        }
    }
}

/// How a batter got out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissalKind {
    /// Bowled
    Bowled,
    /// Caught by a fielder
    Caught,
    /// Leg before wicket
    Lbw,
    /// Stumped by the keeper
    Stumped,
    /// Hit wicket
    HitWicket,
    /// Run out (either batter)
    RunOut,
}

impl DismissalKind {
    /// Bowler-attributable dismissals; run-outs never credit the bowler
    pub fn credits_bowler(&self) -> bool {
        !matches!(self, DismissalKind::RunOut)
    }

    /// Which dismissals are possible on which delivery.
    /// A batter cannot be bowled off a wide, nor caught off a no-ball.
    pub fn valid_on(&self, extra: ExtraType) -> bool {
        match extra {
            ExtraType::None => true,
            ExtraType::Wide => matches!(self, DismissalKind::Stumped | DismissalKind::RunOut),
            ExtraType::NoBall | ExtraType::Bye | ExtraType::LegBye => {
                matches!(self, DismissalKind::RunOut)
            }
        }
    }
}

/// A wicket on one delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dismissal {
    /// How the batter got out
    pub kind: DismissalKind,
    /// The dismissed batter (striker or non-striker)
    pub player: PlayerId,
    /// Fielder involved (catcher, thrower, keeper)
    pub fielder: Option<PlayerId>,
}

/// Scorer input for one bowled delivery.
///
/// The caller stamps the timestamp (the engine never reads clocks); the
/// striker and non-striker are taken from the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInput {
    /// Bowler of this delivery (must match the aggregate's current bowler)
    pub bowler: PlayerId,

    /// Runs credited to the batter (normal deliveries and no-balls)
    pub runs_off_bat: u32,

    /// Extra classification
    pub extra_type: ExtraType,

    /// Runs physically run as extras (wide runs, byes, leg byes) -
    /// excludes the automatic penalty
    pub extra_runs_run: u32,

    /// Ball reached the boundary; boundary runs are never physically run
    pub is_boundary: bool,

    /// Wicket on this delivery, if any
    pub dismissal: Option<Dismissal>,

    /// Submission timestamp, stamped by the caller
    pub timestamp: DateTime<Utc>,
}

/// Canonical delivery record: immutable once appended to the ledger.
///
/// Carries everything replay needs: who was at the crease, who bowled,
/// and the boundary flag strike rotation depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Unique delivery ID (UUIDv7 for time-ordering)
    pub delivery_id: Uuid,

    /// Match this delivery belongs to
    pub match_id: Uuid,

    /// Innings number (1 or 2)
    pub inning: u8,

    /// Over index at the time of delivery (0-based)
    pub over_number: u16,

    /// Slot of the upcoming legal ball (1..=6). Wides and no-balls share
    /// the slot of the legal ball that eventually fills it.
    pub ball_number: u8,

    /// Batter on strike when the ball was bowled
    pub striker: PlayerId,

    /// Batter at the non-striker's end
    pub non_striker: PlayerId,

    /// Bowler
    pub bowler: PlayerId,

    /// Runs credited to the batter
    pub runs_off_bat: u32,

    /// Extra classification
    pub extra_type: ExtraType,

    /// Total extra runs including the automatic penalty
    pub extra_runs: u32,

    /// Ball reached the boundary
    pub is_boundary: bool,

    /// Wicket on this delivery, if any
    pub dismissal: Option<Dismissal>,

    /// Timestamp carried over from the input
    pub timestamp: DateTime<Utc>,
}

impl Delivery {
    /// Legal deliveries count toward over completion
    pub fn is_legal(&self) -> bool {
        self.extra_type.is_legal()
    }

    /// Whether a wicket fell on this delivery
    pub fn is_wicket(&self) -> bool {
        self.dismissal.is_some()
    }

    /// Total runs this delivery contributed to the innings
    pub fn total_runs(&self) -> u32 {
        self.runs_off_bat + self.extra_runs
    }

    /// Runs the batters physically ran (drives strike rotation).
    /// Boundaries and automatic penalties are never run.
    pub fn runs_taken(&self) -> u32 {
        if self.is_boundary {
            return 0;
        }
        match self.extra_type {
            ExtraType::None | ExtraType::NoBall => self.runs_off_bat,
            ExtraType::Wide => self.extra_runs - self.extra_type.automatic_runs(),
            ExtraType::Bye | ExtraType::LegBye => self.extra_runs,
        }
    }
}

/// One batter's line on the scorecard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattingLine {
    /// Runs scored
    pub runs: u32,
    /// Legal balls faced (wides excluded, no-balls included)
    pub balls_faced: u32,
    /// Boundary fours
    pub fours: u32,
    /// Boundary sixes
    pub sixes: u32,
    /// Whether the batter is out
    pub is_out: bool,
    /// How the batter got out
    pub dismissal: Option<DismissalKind>,
}

/// One bowler's line on the scorecard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlingLine {
    /// Legal balls bowled
    pub balls_bowled: u32,
    /// Runs conceded (byes and leg byes excluded)
    pub runs_conceded: u32,
    /// Bowler-credited wickets
    pub wickets_taken: u32,
    /// Overs with nothing conceded
    pub maidens: u32,
}

impl BowlingLine {
    /// Overs in cricket notation, e.g. 4.2
    pub fn overs_bowled(&self) -> String {
        format!("{}.{}", self.balls_bowled / 6, self.balls_bowled % 6)
    }
}

/// Extras conceded by the bowling side, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    /// Wide runs (automatic plus run)
    pub wides: u32,
    /// No-ball penalties
    pub no_balls: u32,
    /// Byes
    pub byes: u32,
    /// Leg byes
    pub leg_byes: u32,
}

impl Extras {
    /// Total extras in the innings
    pub fn total(&self) -> u32 {
        self.wides + self.no_balls + self.byes + self.leg_byes
    }
}

/// Preconditions blocking further scoring until resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gates {
    /// A wicket fell; a replacement batter must be named
    pub needs_new_batter: bool,
    /// The over completed; a bowler must be named for the next one
    pub needs_new_over: bool,
}

impl Gates {
    /// Any gate pending
    pub fn any(&self) -> bool {
        self.needs_new_batter || self.needs_new_over
    }
}

/// Server-authoritative scoring state machine, included in every
/// snapshot. Clients must treat this as override, never as a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPhase {
    /// A replacement batter must be picked before the next ball
    AwaitingBatter,
    /// A bowler must be picked before the next over
    AwaitingBowler,
    /// The next delivery can be scored
    ReadyToScore,
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// An innings is live
    InProgress,
    /// Between innings, waiting for the second to start
    InningsBreak,
    /// Terminal; only administrative reset is accepted
    Completed,
}

/// Final result of a completed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    /// The side batting second reached the target
    ChasingSideWon {
        /// Wickets in hand at the winning run
        wickets_in_hand: u8,
    },
    /// The side batting first defended its total
    DefendingSideWon {
        /// Runs short of the target
        run_margin: u32,
    },
    /// Scores finished level
    Tied,
}

/// Initial match state: openers, toss outcome, format limits.
///
/// The aggregate is created once from this and thereafter exclusively
/// produced by folding the ledger through the engine. Undo replays from
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInit {
    /// Match ID
    pub match_id: Uuid,

    /// Overs per innings for this format
    pub overs_limit: u16,

    /// Every player taking part in the match
    pub squad: Vec<PlayerId>,

    /// Opening striker
    pub opening_striker: PlayerId,

    /// Opening non-striker
    pub opening_non_striker: PlayerId,

    /// Opening bowler
    pub opening_bowler: PlayerId,

    /// Match start timestamp
    pub started_at: DateTime<Utc>,
}

impl MatchInit {
    /// Validate init invariants before creating the aggregate
    pub fn validate(&self) -> crate::Result<()> {
        if self.overs_limit == 0 {
            return Err(crate::Error::Validation(
                "overs limit must be at least 1".to_string(),
            ));
        }
        if self.opening_striker == self.opening_non_striker {
            return Err(crate::Error::Validation(
                "striker and non-striker must differ".to_string(),
            ));
        }
        for opener in [
            &self.opening_striker,
            &self.opening_non_striker,
            &self.opening_bowler,
        ] {
            if !self.squad.contains(opener) {
                return Err(crate::Error::PlayerNotFound(opener.to_string()));
            }
        }
        Ok(())
    }
}

/// Derived current match state: the fold of the ledger through the
/// engine. Never hand-edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAggregate {
    /// Match ID
    pub match_id: Uuid,

    /// Current innings (1 or 2)
    pub current_inning: u8,

    /// Runs scored in the current innings
    pub total_runs: u32,

    /// Wickets down in the current innings (≤ 10)
    pub total_wickets: u8,

    /// Completed overs in the current innings
    pub overs_completed: u16,

    /// Legal balls bowled in the over in progress (0..6)
    pub balls_this_over: u8,

    /// Batter on strike
    pub current_striker: PlayerId,

    /// Batter at the non-striker's end
    pub current_non_striker: PlayerId,

    /// Bowler of the over in progress; None while an over gate is pending
    pub current_bowler: Option<PlayerId>,

    /// Bowler of the final ball of the previous over: barred from
    /// bowling the next one
    pub last_ball_bowler: Option<PlayerId>,

    /// Lifecycle status
    pub status: MatchStatus,

    /// Server-authoritative scoring phase
    pub phase: ScoringPhase,

    /// Runs required to win the chase (first-innings total + 1)
    pub target: Option<u32>,

    /// Overs per innings
    pub overs_limit: u16,

    /// Extras breakdown for the current innings
    pub extras: Extras,

    /// Batting scorecard, by player
    pub batting_scorecard: HashMap<PlayerId, BattingLine>,

    /// Bowling scorecard, by player
    pub bowling_scorecard: HashMap<PlayerId, BowlingLine>,

    /// Pending gates
    pub gates: Gates,

    /// Runs charged to the bowler in the over in progress (maiden check)
    pub bowler_runs_this_over: u32,

    /// Result once the match completes
    pub result: Option<MatchResult>,

    /// Players known to this match
    pub squad: HashSet<PlayerId>,

    /// Match creation timestamp
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last applied delivery
    pub updated_at: DateTime<Utc>,
}

impl MatchAggregate {
    /// Create the initial aggregate from the match init
    pub fn new(init: &MatchInit) -> Self {
        let mut batting_scorecard = HashMap::new();
        batting_scorecard.insert(init.opening_striker.clone(), BattingLine::default());
        batting_scorecard.insert(init.opening_non_striker.clone(), BattingLine::default());

        let mut bowling_scorecard = HashMap::new();
        bowling_scorecard.insert(init.opening_bowler.clone(), BowlingLine::default());

        Self {
            match_id: init.match_id,
            current_inning: 1,
            total_runs: 0,
            total_wickets: 0,
            overs_completed: 0,
            balls_this_over: 0,
            current_striker: init.opening_striker.clone(),
            current_non_striker: init.opening_non_striker.clone(),
            current_bowler: Some(init.opening_bowler.clone()),
            last_ball_bowler: None,
            status: MatchStatus::InProgress,
            phase: ScoringPhase::ReadyToScore,
            target: None,
            overs_limit: init.overs_limit,
            extras: Extras::default(),
            batting_scorecard,
            bowling_scorecard,
            gates: Gates::default(),
            bowler_runs_this_over: 0,
            result: None,
            squad: init.squad.iter().cloned().collect(),
            created_at: init.started_at,
            updated_at: init.started_at,
        }
    }

    /// Whether the match accepts further mutations
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, MatchStatus::Completed)
    }

    /// Whether a player belongs to this match
    pub fn knows_player(&self, player: &PlayerId) -> bool {
        self.squad.contains(player)
    }

    /// Recompute the scoring phase from gates and bowler state
    pub(crate) fn refresh_phase(&mut self) {
        self.phase = if self.gates.needs_new_batter {
            ScoringPhase::AwaitingBatter
        } else if self.gates.needs_new_over || self.current_bowler.is_none() {
            ScoringPhase::AwaitingBowler
        } else {
            ScoringPhase::ReadyToScore
        };
    }
}

/// Point-in-time view of a match, pushed to every subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Per-match mutation sequence number
    pub seq: u64,

    /// The full aggregate
    pub aggregate: MatchAggregate,
}

/// Sort order for delivery history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    /// Oldest first
    Chronological,
    /// Most recent first
    NewestFirst,
}

/// Paginated delivery history query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one innings
    pub inning: Option<u8>,
    /// Sort order
    pub order: HistoryOrder,
    /// Page number (0-based)
    pub page: usize,
    /// Page size
    pub per_page: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            inning: None,
            order: HistoryOrder::Chronological,
            page: 0,
            per_page: 50,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Page number (0-based)
    pub page: usize,
    /// Page size requested
    pub per_page: usize,
    /// Total matching items across all pages
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() -> MatchInit {
        MatchInit {
            match_id: Uuid::now_v7(),
            overs_limit: 20,
            squad: vec![
                PlayerId::new("bat-1"),
                PlayerId::new("bat-2"),
                PlayerId::new("bowl-1"),
            ],
            opening_striker: PlayerId::new("bat-1"),
            opening_non_striker: PlayerId::new("bat-2"),
            opening_bowler: PlayerId::new("bowl-1"),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_extra_type_legality() {
        assert!(ExtraType::None.is_legal());
        assert!(ExtraType::Bye.is_legal());
        assert!(ExtraType::LegBye.is_legal());
        assert!(!ExtraType::Wide.is_legal());
        assert!(!ExtraType::NoBall.is_legal());
    }

    #[test]
    fn test_dismissal_compatibility() {
        assert!(DismissalKind::Bowled.valid_on(ExtraType::None));
        assert!(!DismissalKind::Bowled.valid_on(ExtraType::Wide));
        assert!(DismissalKind::Stumped.valid_on(ExtraType::Wide));
        assert!(!DismissalKind::Caught.valid_on(ExtraType::NoBall));
        assert!(DismissalKind::RunOut.valid_on(ExtraType::NoBall));
        assert!(DismissalKind::RunOut.valid_on(ExtraType::Bye));
    }

    #[test]
    fn test_dismissal_bowler_credit() {
        assert!(DismissalKind::Bowled.credits_bowler());
        assert!(DismissalKind::Stumped.credits_bowler());
        assert!(!DismissalKind::RunOut.credits_bowler());
    }

    #[test]
    fn test_init_validation() {
        let good = init();
        assert!(good.validate().is_ok());

        let mut same_openers = init();
        same_openers.opening_non_striker = same_openers.opening_striker.clone();
        assert!(same_openers.validate().is_err());

        let mut stranger = init();
        stranger.opening_bowler = PlayerId::new("not-in-squad");
        assert!(matches!(
            stranger.validate(),
            Err(crate::Error::PlayerNotFound(_))
        ));
    }

    #[test]
    fn test_new_aggregate() {
        let init = init();
        let agg = MatchAggregate::new(&init);

        assert_eq!(agg.current_inning, 1);
        assert_eq!(agg.total_runs, 0);
        assert_eq!(agg.status, MatchStatus::InProgress);
        assert_eq!(agg.phase, ScoringPhase::ReadyToScore);
        assert_eq!(agg.current_bowler, Some(init.opening_bowler.clone()));
        assert!(agg.batting_scorecard.contains_key(&init.opening_striker));
        assert!(!agg.is_terminal());
    }

    #[test]
    fn test_overs_notation() {
        let line = BowlingLine {
            balls_bowled: 26,
            ..Default::default()
        };
        assert_eq!(line.overs_bowled(), "4.2");
    }

    #[test]
    fn test_runs_taken_excludes_penalty_and_boundary() {
        let base = Delivery {
            delivery_id: Uuid::now_v7(),
            match_id: Uuid::now_v7(),
            inning: 1,
            over_number: 0,
            ball_number: 1,
            striker: PlayerId::new("s"),
            non_striker: PlayerId::new("n"),
            bowler: PlayerId::new("b"),
            runs_off_bat: 0,
            extra_type: ExtraType::Wide,
            extra_runs: 2,
            is_boundary: false,
            dismissal: None,
            timestamp: Utc::now(),
        };
        // Wide with one run actually run
        assert_eq!(base.runs_taken(), 1);

        // Boundary four off the bat: nothing physically run
        let four = Delivery {
            extra_type: ExtraType::None,
            extra_runs: 0,
            runs_off_bat: 4,
            is_boundary: true,
            ..base.clone()
        };
        assert_eq!(four.runs_taken(), 0);
        assert_eq!(four.total_runs(), 4);
    }

    #[test]
    fn test_snapshot_serialization_round_trip() {
        let agg = MatchAggregate::new(&init());
        let snapshot = MatchSnapshot { seq: 7, aggregate: agg };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: MatchSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seq, 7);
        assert_eq!(back.aggregate, snapshot.aggregate);
    }
}
