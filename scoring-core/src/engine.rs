//! The delivery-scoring state machine
//!
//! Pure functions from (aggregate, input) to a new aggregate: no I/O,
//! no clocks, no shared state. Persistence and broadcast belong to the
//! caller. Determinism here is what makes replay-based undo correct:
//! folding the same canonical records from the same initial state always
//! reproduces the same aggregate.

use crate::types::{
    Delivery, DeliveryInput, ExtraType, Gates, MatchAggregate, MatchResult, MatchStatus, PlayerId,
};
use crate::{Error, Result};
use uuid::Uuid;

/// Legal balls per over
pub const BALLS_PER_OVER: u8 = 6;

/// Wickets that end an innings
pub const ALL_OUT_WICKETS: u8 = 10;

/// Score one delivery.
///
/// Validates the input against the aggregate, builds the canonical
/// delivery record, and folds it into a new aggregate. Either the whole
/// new aggregate is returned or nothing changed.
pub fn apply(aggregate: &MatchAggregate, input: &DeliveryInput) -> Result<(MatchAggregate, Delivery)> {
    validate(aggregate, input)?;
    let delivery = canonicalize(aggregate, input);
    let next = fold_delivery(aggregate, &delivery);
    Ok((next, delivery))
}

/// Validate a delivery input against the current aggregate.
///
/// Everything here rejects before any state change.
fn validate(aggregate: &MatchAggregate, input: &DeliveryInput) -> Result<()> {
    match aggregate.status {
        MatchStatus::Completed => {
            return Err(Error::Conflict("match is completed".to_string()));
        }
        MatchStatus::InningsBreak => {
            return Err(Error::Conflict(
                "innings break: start the next innings before scoring".to_string(),
            ));
        }
        MatchStatus::InProgress => {}
    }

    if aggregate.gates.needs_new_batter {
        return Err(Error::Conflict(
            "a replacement batter must be named before scoring".to_string(),
        ));
    }
    if aggregate.gates.needs_new_over {
        return Err(Error::Conflict(
            "a bowler must be named for the new over before scoring".to_string(),
        ));
    }

    match &aggregate.current_bowler {
        Some(bowler) if *bowler == input.bowler => {}
        Some(_) => {
            return Err(Error::Conflict(
                "mid-over bowler change requires an authorized substitution".to_string(),
            ));
        }
        None => {
            return Err(Error::Conflict("no bowler set for this over".to_string()));
        }
    }

    match input.extra_type {
        ExtraType::None | ExtraType::NoBall => {
            if input.extra_runs_run != 0 {
                return Err(Error::Validation(
                    "runs on this delivery are recorded as runs_off_bat, not extras".to_string(),
                ));
            }
        }
        ExtraType::Wide | ExtraType::Bye | ExtraType::LegBye => {
            if input.runs_off_bat != 0 {
                return Err(Error::Validation(
                    "runs off the bat are not possible on a wide, bye or leg bye".to_string(),
                ));
            }
        }
    }

    if input.is_boundary {
        let run_value = input.runs_off_bat.max(input.extra_runs_run);
        if run_value != 4 && run_value != 6 {
            return Err(Error::Validation(
                "a boundary must be worth 4 or 6".to_string(),
            ));
        }
    }

    if let Some(dismissal) = &input.dismissal {
        if !dismissal.kind.valid_on(input.extra_type) {
            return Err(Error::Validation(format!(
                "dismissal {:?} is not possible on a {:?} delivery",
                dismissal.kind, input.extra_type
            )));
        }
        if !aggregate.knows_player(&dismissal.player) {
            return Err(Error::PlayerNotFound(dismissal.player.to_string()));
        }
        if dismissal.player != aggregate.current_striker
            && dismissal.player != aggregate.current_non_striker
        {
            return Err(Error::Validation(
                "dismissed player is not at the crease".to_string(),
            ));
        }
        if let Some(fielder) = &dismissal.fielder {
            if !aggregate.knows_player(fielder) {
                return Err(Error::PlayerNotFound(fielder.to_string()));
            }
        }
    }

    Ok(())
}

/// Build the canonical record for a validated input.
///
/// The record carries the pre-delivery crease arrangement and over slot,
/// which is exactly what replay needs to re-derive gate resolutions.
fn canonicalize(aggregate: &MatchAggregate, input: &DeliveryInput) -> Delivery {
    Delivery {
        delivery_id: Uuid::now_v7(),
        match_id: aggregate.match_id,
        inning: aggregate.current_inning,
        over_number: aggregate.overs_completed,
        ball_number: aggregate.balls_this_over + 1,
        striker: aggregate.current_striker.clone(),
        non_striker: aggregate.current_non_striker.clone(),
        bowler: input.bowler.clone(),
        runs_off_bat: input.runs_off_bat,
        extra_type: input.extra_type,
        extra_runs: input.extra_type.automatic_runs() + input.extra_runs_run,
        is_boundary: input.is_boundary,
        dismissal: input.dismissal.clone(),
        timestamp: input.timestamp,
    }
}

/// Fold one canonical delivery into the aggregate.
///
/// Deterministic in the record alone; used by live scoring and by the
/// undo replay. Assumes the record was validated when it was created.
pub(crate) fn fold_delivery(aggregate: &MatchAggregate, delivery: &Delivery) -> MatchAggregate {
    let mut next = aggregate.clone();

    // Run attribution
    next.total_runs += delivery.total_runs();
    match delivery.extra_type {
        ExtraType::Wide => next.extras.wides += delivery.extra_runs,
        ExtraType::NoBall => next.extras.no_balls += delivery.extra_type.automatic_runs(),
        ExtraType::Bye => next.extras.byes += delivery.extra_runs,
        ExtraType::LegBye => next.extras.leg_byes += delivery.extra_runs,
        ExtraType::None => {}
    }

    // Batter: wides are the only delivery not faced
    {
        let line = next
            .batting_scorecard
            .entry(delivery.striker.clone())
            .or_default();
        if delivery.extra_type != ExtraType::Wide {
            line.balls_faced += 1;
        }
        line.runs += delivery.runs_off_bat;
        if delivery.is_boundary
            && matches!(delivery.extra_type, ExtraType::None | ExtraType::NoBall)
        {
            match delivery.runs_off_bat {
                4 => line.fours += 1,
                6 => line.sixes += 1,
                _ => {}
            }
        }
    }

    // Bowler: byes and leg byes are never charged to the bowler
    let conceded = match delivery.extra_type {
        ExtraType::None => delivery.runs_off_bat,
        ExtraType::NoBall => delivery.extra_type.automatic_runs() + delivery.runs_off_bat,
        ExtraType::Wide => delivery.extra_runs,
        ExtraType::Bye | ExtraType::LegBye => 0,
    };
    {
        let line = next
            .bowling_scorecard
            .entry(delivery.bowler.clone())
            .or_default();
        if delivery.is_legal() {
            line.balls_bowled += 1;
        }
        line.runs_conceded += conceded;
    }
    next.bowler_runs_this_over += conceded;

    // Wicket
    if let Some(dismissal) = &delivery.dismissal {
        next.total_wickets += 1;
        let line = next
            .batting_scorecard
            .entry(dismissal.player.clone())
            .or_default();
        line.is_out = true;
        line.dismissal = Some(dismissal.kind);
        if dismissal.kind.credits_bowler() {
            next.bowling_scorecard
                .entry(delivery.bowler.clone())
                .or_default()
                .wickets_taken += 1;
        }
    }

    // Strike rotation: odd number of runs physically run
    if delivery.runs_taken() % 2 == 1 {
        std::mem::swap(&mut next.current_striker, &mut next.current_non_striker);
    }

    // Over completion on the 6th legal ball
    if delivery.is_legal() {
        next.balls_this_over += 1;
        if next.balls_this_over >= BALLS_PER_OVER {
            next.overs_completed += 1;
            next.balls_this_over = 0;
            std::mem::swap(&mut next.current_striker, &mut next.current_non_striker);
            if next.bowler_runs_this_over == 0 {
                next.bowling_scorecard
                    .entry(delivery.bowler.clone())
                    .or_default()
                    .maidens += 1;
            }
            next.bowler_runs_this_over = 0;
            next.last_ball_bowler = Some(delivery.bowler.clone());
            next.current_bowler = None;
            next.gates.needs_new_over = true;
        }
    }

    // A fallen wicket gates scoring until a replacement is named,
    // whichever batter it was
    if delivery.is_wicket() && next.total_wickets < ALL_OUT_WICKETS {
        next.gates.needs_new_batter = true;
    }

    // Innings and match completion
    let target_met = matches!(next.target, Some(target) if next.total_runs >= target);
    let innings_over = next.total_wickets >= ALL_OUT_WICKETS
        || next.overs_completed >= next.overs_limit
        || target_met;
    if innings_over {
        next.gates = Gates::default();
        next.current_bowler = None;
        next.bowler_runs_this_over = 0;
        if next.current_inning == 1 {
            next.status = MatchStatus::InningsBreak;
            next.target = Some(next.total_runs + 1);
        } else {
            next.status = MatchStatus::Completed;
            next.result = Some(compute_result(&next, target_met));
        }
    }

    next.updated_at = delivery.timestamp;
    next.refresh_phase();
    next
}

/// Result of a finished second innings
fn compute_result(aggregate: &MatchAggregate, target_met: bool) -> MatchResult {
    if target_met {
        return MatchResult::ChasingSideWon {
            wickets_in_hand: ALL_OUT_WICKETS - aggregate.total_wickets,
        };
    }
    let target = aggregate.target.unwrap_or(aggregate.total_runs + 1);
    let to_win = target.saturating_sub(1);
    if aggregate.total_runs == to_win {
        MatchResult::Tied
    } else {
        MatchResult::DefendingSideWon {
            run_margin: to_win - aggregate.total_runs,
        }
    }
}

/// Name the bowler for a new over, resolving the over gate.
///
/// The bowler of the final ball of the previous over cannot bowl
/// consecutive overs.
pub fn start_over(aggregate: &MatchAggregate, bowler: &PlayerId) -> Result<MatchAggregate> {
    if aggregate.is_terminal() {
        return Err(Error::Conflict("match is completed".to_string()));
    }
    if !aggregate.gates.needs_new_over {
        return Err(Error::Conflict("no new-over gate is pending".to_string()));
    }
    if !aggregate.knows_player(bowler) {
        return Err(Error::PlayerNotFound(bowler.to_string()));
    }
    if aggregate.last_ball_bowler.as_ref() == Some(bowler) {
        return Err(Error::Conflict(format!(
            "bowler {} bowled the previous over and cannot bowl consecutive overs",
            bowler
        )));
    }

    let mut next = aggregate.clone();
    next.current_bowler = Some(bowler.clone());
    next.gates.needs_new_over = false;
    next.refresh_phase();
    Ok(next)
}

/// Name the replacement for a dismissed batter, resolving the batter gate
pub fn replace_batter(aggregate: &MatchAggregate, batter: &PlayerId) -> Result<MatchAggregate> {
    if aggregate.is_terminal() {
        return Err(Error::Conflict("match is completed".to_string()));
    }
    if !aggregate.gates.needs_new_batter {
        return Err(Error::Conflict("no new-batter gate is pending".to_string()));
    }
    if !aggregate.knows_player(batter) {
        return Err(Error::PlayerNotFound(batter.to_string()));
    }
    if let Some(line) = aggregate.batting_scorecard.get(batter) {
        if line.is_out {
            return Err(Error::Validation(format!(
                "{} is out and cannot bat again",
                batter
            )));
        }
    }
    if *batter == aggregate.current_striker || *batter == aggregate.current_non_striker {
        return Err(Error::Validation(format!(
            "{} is already at the crease",
            batter
        )));
    }

    let striker_out = aggregate
        .batting_scorecard
        .get(&aggregate.current_striker)
        .map(|line| line.is_out)
        .unwrap_or(false);
    let non_striker_out = aggregate
        .batting_scorecard
        .get(&aggregate.current_non_striker)
        .map(|line| line.is_out)
        .unwrap_or(false);

    let mut next = aggregate.clone();
    if striker_out {
        next.current_striker = batter.clone();
    } else if non_striker_out {
        next.current_non_striker = batter.clone();
    } else {
        return Err(Error::Other(
            "new-batter gate pending but no dismissed batter at the crease".to_string(),
        ));
    }
    next.batting_scorecard.entry(batter.clone()).or_default();
    next.gates.needs_new_batter = false;
    next.refresh_phase();
    Ok(next)
}

/// Authorized mid-over bowler substitution (injury etc.).
///
/// Whoever ends up bowling the final ball of the over inherits the
/// no-consecutive-overs restriction.
pub fn substitute_bowler(aggregate: &MatchAggregate, bowler: &PlayerId) -> Result<MatchAggregate> {
    if aggregate.is_terminal() {
        return Err(Error::Conflict("match is completed".to_string()));
    }
    if aggregate.status != MatchStatus::InProgress {
        return Err(Error::Conflict("no over is in progress".to_string()));
    }
    if aggregate.gates.needs_new_over {
        return Err(Error::Conflict(
            "over gate pending: name the bowler with start_over".to_string(),
        ));
    }
    if !aggregate.knows_player(bowler) {
        return Err(Error::PlayerNotFound(bowler.to_string()));
    }
    if aggregate.current_bowler.as_ref() == Some(bowler) {
        return Err(Error::Validation(format!("{} is already bowling", bowler)));
    }

    let mut next = aggregate.clone();
    next.current_bowler = Some(bowler.clone());
    next.refresh_phase();
    Ok(next)
}

/// Transition from the innings break into the second innings
pub fn begin_second_innings(
    aggregate: &MatchAggregate,
    striker: &PlayerId,
    non_striker: &PlayerId,
    bowler: &PlayerId,
) -> Result<MatchAggregate> {
    if aggregate.is_terminal() {
        return Err(Error::Conflict("match is completed".to_string()));
    }
    if aggregate.status != MatchStatus::InningsBreak {
        return Err(Error::Conflict(
            "the current innings has not finished".to_string(),
        ));
    }
    if striker == non_striker {
        return Err(Error::Validation(
            "striker and non-striker must differ".to_string(),
        ));
    }
    for player in [striker, non_striker, bowler] {
        if !aggregate.knows_player(player) {
            return Err(Error::PlayerNotFound(player.to_string()));
        }
    }

    let mut next = aggregate.clone();
    next.current_inning += 1;
    next.total_runs = 0;
    next.total_wickets = 0;
    next.overs_completed = 0;
    next.balls_this_over = 0;
    next.extras = Default::default();
    next.bowler_runs_this_over = 0;
    next.gates = Gates::default();
    next.last_ball_bowler = None;
    next.current_striker = striker.clone();
    next.current_non_striker = non_striker.clone();
    next.current_bowler = Some(bowler.clone());
    next.batting_scorecard.entry(striker.clone()).or_default();
    next.batting_scorecard
        .entry(non_striker.clone())
        .or_default();
    next.bowling_scorecard.entry(bowler.clone()).or_default();
    next.status = MatchStatus::InProgress;
    next.refresh_phase();
    Ok(next)
}

/// Re-derive gate resolutions from a canonical record during replay.
///
/// Over starts, batter replacements, innings transitions and mid-over
/// substitutions are not ledger entries; the record itself names who was
/// at the crease and who bowled, which is enough to reconstruct them.
pub(crate) fn resolve_for_replay(
    aggregate: MatchAggregate,
    record: &Delivery,
) -> Result<MatchAggregate> {
    let mut aggregate = aggregate;

    if record.inning != aggregate.current_inning {
        if record.inning == aggregate.current_inning + 1
            && aggregate.status == MatchStatus::InningsBreak
        {
            aggregate = begin_second_innings(
                &aggregate,
                &record.striker,
                &record.non_striker,
                &record.bowler,
            )?;
        } else {
            return Err(Error::LedgerCorruption(format!(
                "delivery for innings {} cannot follow innings {}",
                record.inning, aggregate.current_inning
            )));
        }
    }

    if aggregate.gates.needs_new_batter {
        aggregate.current_striker = record.striker.clone();
        aggregate.current_non_striker = record.non_striker.clone();
        aggregate
            .batting_scorecard
            .entry(record.striker.clone())
            .or_default();
        aggregate
            .batting_scorecard
            .entry(record.non_striker.clone())
            .or_default();
        aggregate.gates.needs_new_batter = false;
    }

    if aggregate.gates.needs_new_over {
        aggregate.current_bowler = Some(record.bowler.clone());
        aggregate.gates.needs_new_over = false;
    }

    // A recorded bowler differing mid-over means a substitution happened
    if aggregate.current_bowler.as_ref() != Some(&record.bowler) {
        aggregate.current_bowler = Some(record.bowler.clone());
    }

    if aggregate.current_striker != record.striker
        || aggregate.current_non_striker != record.non_striker
    {
        return Err(Error::LedgerCorruption(format!(
            "recorded batters for delivery {} do not match the replayed state",
            record.delivery_id
        )));
    }

    aggregate.refresh_phase();
    Ok(aggregate)
}
