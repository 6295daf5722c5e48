use proptest::prelude::*;

use scorebook_stats::{Outcome, StandingsAggregator, TeamDelta, TeamStanding};
use scorebook_stats::{MatchDeltas, PlayerCounters, PlayerDelta, PlayerKey};
use scorebook_types::FingerprintHasher;

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Win), Just(Outcome::Loss), Just(Outcome::Draw)]
}

prop_compose! {
    fn team_delta(team: &'static str)(
        outcome in outcome(),
        runs_scored in 0u64..400,
        balls_faced in 0u64..300,
        runs_conceded in 0u64..400,
        balls_bowled in 0u64..300,
    ) -> TeamDelta {
        TeamDelta {
            team: team.into(),
            outcome,
            runs_scored,
            balls_faced,
            runs_conceded,
            balls_bowled,
        }
    }
}

prop_compose! {
    fn match_deltas(id: usize)(
        a in team_delta("a"),
        runs in 0u64..200,
        wickets in 0u64..6,
    ) -> MatchDeltas {
        let mut b = a.clone();
        b.team = "b".into();
        b.outcome = a.outcome.reversed();
        std::mem::swap(&mut b.runs_scored, &mut b.runs_conceded);
        std::mem::swap(&mut b.balls_faced, &mut b.balls_bowled);
        MatchDeltas {
            match_id: format!("m{id}").into(),
            fingerprint: FingerprintHasher::SCORECARD.hash(id.to_string().as_bytes()),
            season: "2024".into(),
            teams: [a, b],
            players: vec![PlayerDelta {
                key: PlayerKey::new("2024".into(), "a".into(), "a.star".into()),
                counters: PlayerCounters {
                    matches: 1,
                    runs,
                    wickets,
                    ..Default::default()
                },
            }],
        }
    }
}

proptest! {
    #[test]
    fn retract_inverts_apply(
        history in proptest::collection::vec(team_delta("a"), 0..8),
        delta in team_delta("a"),
    ) {
        let mut row = TeamStanding::new("a".into());
        for d in &history {
            row.apply(d).unwrap();
        }
        let before = row.clone();
        row.apply(&delta).unwrap();
        row.retract(&delta).unwrap();
        prop_assert_eq!(row, before);
    }

    #[test]
    fn matches_played_equals_results(history in proptest::collection::vec(team_delta("a"), 0..12)) {
        let mut row = TeamStanding::new("a".into());
        for d in &history {
            row.apply(d).unwrap();
            prop_assert!(row.is_consistent());
        }
        prop_assert_eq!(row.matches_played as usize, history.len());
    }

    #[test]
    fn fold_order_does_not_matter(
        first in match_deltas(1),
        second in match_deltas(2),
        third in match_deltas(3),
    ) {
        let mut forward = StandingsAggregator::new();
        let mut backward = StandingsAggregator::new();
        for d in [&first, &second, &third] {
            forward.apply(d).unwrap();
        }
        for d in [&third, &second, &first] {
            backward.apply(d).unwrap();
        }
        prop_assert_eq!(
            forward.standings().cloned().collect::<Vec<_>>(),
            backward.standings().cloned().collect::<Vec<_>>()
        );
        prop_assert_eq!(
            forward.players().cloned().collect::<Vec<_>>(),
            backward.players().cloned().collect::<Vec<_>>()
        );
    }

    #[test]
    fn net_run_rate_is_always_finite(d in team_delta("a")) {
        let mut row = TeamStanding::new("a".into());
        row.apply(&d).unwrap();
        prop_assert!(row.net_run_rate().is_finite());
    }
}
