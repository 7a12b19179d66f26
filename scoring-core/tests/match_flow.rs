//! End-to-end match flow through the registry and actor API
//!
//! Plays a full two-innings short-format match the way the scoring
//! service drives it: gates resolved explicitly, one undo mid-innings,
//! and a subscriber reconciling its own snapshot from the realtime
//! channel (full states replaced, deltas merged field-wise).

use chrono::Utc;
use scoring_core::{
    Config, DeliveryInput, Dismissal, DismissalKind, ExtraType, HistoryOrder, HistoryQuery,
    MatchEvent, MatchInit, MatchRegistry, MatchResult, MatchStatus, PlayerId, ScoringPhase,
};
use uuid::Uuid;

fn player(id: &str) -> PlayerId {
    PlayerId::new(id)
}

fn test_init(overs_limit: u16) -> MatchInit {
    MatchInit {
        match_id: Uuid::now_v7(),
        overs_limit,
        squad: vec![
            player("home-1"),
            player("home-2"),
            player("home-3"),
            player("away-1"),
            player("away-2"),
            player("away-3"),
        ],
        opening_striker: player("home-1"),
        opening_non_striker: player("home-2"),
        opening_bowler: player("away-1"),
        started_at: Utc::now(),
    }
}

fn ball(bowler: &str, runs: u32) -> DeliveryInput {
    DeliveryInput {
        bowler: player(bowler),
        runs_off_bat: runs,
        extra_type: ExtraType::None,
        extra_runs_run: 0,
        is_boundary: false,
        dismissal: None,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_full_match_lifecycle() {
    let registry = MatchRegistry::new(Config::default()).unwrap();
    let init = test_init(1);
    let match_id = init.match_id;
    let handle = registry.create_match(init).unwrap();

    let mut events = handle.subscribe_events();

    // First innings: one over, a wide, a wicket, and an undone mistake
    handle.score_delivery(ball("away-1", 4)).await.unwrap();

    let wide = DeliveryInput {
        extra_type: ExtraType::Wide,
        runs_off_bat: 0,
        ..ball("away-1", 0)
    };
    handle.score_delivery(wide).await.unwrap();

    // Fat-fingered six, taken back immediately
    handle.score_delivery(ball("away-1", 6)).await.unwrap();
    let after_undo = handle.undo_last().await.unwrap();
    assert_eq!(after_undo.aggregate.total_runs, 5);

    let mut wicket = ball("away-1", 0);
    wicket.dismissal = Some(Dismissal {
        kind: DismissalKind::Caught,
        player: player("home-1"),
        fielder: Some(player("away-2")),
    });
    let gated = handle.score_delivery(wicket).await.unwrap();
    assert_eq!(gated.aggregate.phase, ScoringPhase::AwaitingBatter);

    handle.replace_batter(player("home-3")).await.unwrap();
    for _ in 0..4 {
        handle.score_delivery(ball("away-1", 1)).await.unwrap();
    }

    // Six legal balls bowled: the innings (1 over) is done
    let break_snapshot = handle.snapshot().await.unwrap();
    assert_eq!(break_snapshot.aggregate.status, MatchStatus::InningsBreak);
    assert_eq!(break_snapshot.aggregate.total_runs, 9);
    assert_eq!(break_snapshot.aggregate.target, Some(10));

    // Second innings: the away side chases 10
    handle
        .start_innings(player("away-2"), player("away-3"), player("home-1"))
        .await
        .unwrap();

    for _ in 0..2 {
        let mut four = ball("home-1", 4);
        four.is_boundary = true;
        handle.score_delivery(four).await.unwrap();
    }
    let mut winning_hit = ball("home-1", 2);
    let done = handle.score_delivery(winning_hit.clone()).await.unwrap();
    assert_eq!(done.aggregate.status, MatchStatus::Completed);
    assert_eq!(
        done.aggregate.result,
        Some(MatchResult::ChasingSideWon { wickets_in_hand: 10 })
    );

    // Terminal state refuses further scoring
    winning_hit.timestamp = Utc::now();
    assert!(handle.score_delivery(winning_hit).await.unwrap_err().is_conflict());

    // A reconnecting client reconciles from the channel alone
    let mut client = None;
    while let Ok(event) = events.try_recv() {
        match event {
            MatchEvent::FullState(snapshot) => client = Some(snapshot),
            MatchEvent::Delta(delta) => {
                if let Some(snapshot) = client.as_mut() {
                    delta.apply_to(snapshot);
                }
            }
        }
    }
    // The first full state arrived with the undo; everything after
    // merged on top must equal the server's view
    let client = client.expect("undo should have produced a full state");
    let server = handle.snapshot().await.unwrap();
    assert_eq!(client.seq, server.seq);
    assert_eq!(client.aggregate.total_runs, server.aggregate.total_runs);
    assert_eq!(client.aggregate.status, server.aggregate.status);
    assert_eq!(client.aggregate.result, server.aggregate.result);
    assert_eq!(client.aggregate.phase, server.aggregate.phase);

    // History is filterable by innings and orderable
    let second = handle
        .history(HistoryQuery {
            inning: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(second.total, 3);

    let newest = handle
        .history(HistoryQuery {
            order: HistoryOrder::NewestFirst,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(newest.items[0].runs_off_bat, 2);

    registry.remove(&match_id).await.unwrap();
}

#[tokio::test]
async fn test_consecutive_over_rule_through_api() {
    let registry = MatchRegistry::new(Config::default()).unwrap();
    let handle = registry.create_match(test_init(2)).unwrap();

    for _ in 0..6 {
        handle.score_delivery(ball("away-1", 0)).await.unwrap();
    }

    let err = handle.start_over(player("away-1")).await.unwrap_err();
    assert!(err.is_conflict());
    handle.start_over(player("away-2")).await.unwrap();
    handle.score_delivery(ball("away-2", 1)).await.unwrap();
}
