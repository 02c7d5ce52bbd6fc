use bracket_core::options::TournamentOptionValues;
use bracket_core::{
    MatchResult, MatchState, Participant, ParticipantId, Section, Swiss, Tournament,
    TournamentId, TournamentKind, TournamentState,
};

fn tournament(kind: TournamentKind, participants: u64) -> Tournament {
    let mut tournament =
        Tournament::new(TournamentId(1), kind, TournamentOptionValues::new()).unwrap();

    for i in 1..=participants {
        tournament
            .add_participant(Participant::new(
                ParticipantId(i),
                TournamentId(1),
                format!("Player {}", i),
                i as u32,
            ))
            .unwrap();
    }

    tournament
}

fn pair(entrants: &[Option<ParticipantId>]) -> (u64, u64) {
    let ids: Vec<u64> = entrants.iter().map(|id| id.unwrap().0).collect();
    (ids[0].min(ids[1]), ids[0].max(ids[1]))
}

#[test]
fn single_elimination_eight() {
    let mut tournament = tournament(TournamentKind::SingleElimination, 8);
    let stats = tournament.start().unwrap();

    assert_eq!(stats.rounds, 3);
    assert_eq!(stats.byes, 0);
    assert_eq!(tournament.matches().len(), 7);

    let mut pairs: Vec<_> = tournament
        .matches()
        .round(Section::Main, 1)
        .map(|m| {
            assert_eq!(m.state, MatchState::Open);
            let entrants: Vec<_> = m.entrants.iter().map(|slot| slot.entrant).collect();
            pair(&entrants)
        })
        .collect();
    pairs.sort();

    assert_eq!(pairs, [(1, 8), (2, 7), (3, 6), (4, 5)]);
}

#[test]
fn swiss_recommended_rounds() {
    assert_eq!(Swiss::recommended_rounds(9), 4);

    let mut tournament = tournament(TournamentKind::Swiss, 9);
    let stats = tournament.start().unwrap();
    assert_eq!(stats.rounds, 4);
}

#[test]
fn single_elimination_byes() {
    let mut tournament = tournament(TournamentKind::SingleElimination, 5);
    let stats = tournament.start().unwrap();

    assert_eq!(stats.byes, 3);

    let first: Vec<_> = tournament.matches().round(Section::Main, 1).collect();
    assert_eq!(first.len(), 1);
    let entrants: Vec<_> = first[0].entrants.iter().map(|slot| slot.entrant).collect();
    assert_eq!(pair(&entrants), (4, 5));

    // Seeds 1 to 3 wait in the second round without playing.
    let mut waiting: Vec<u64> = tournament
        .matches()
        .round(Section::Main, 2)
        .flat_map(|m| m.entrants.iter())
        .filter(|slot| slot.source.is_none())
        .filter_map(|slot| slot.entrant)
        .map(|id| id.0)
        .collect();
    waiting.sort();
    assert_eq!(waiting, [1, 2, 3]);

    // Byes are never recorded as matches.
    assert!(tournament.matches().iter().all(|m| m.entrants.len() == 2));
}

#[test]
fn free_for_all_points() {
    let mut tournament = tournament(TournamentKind::FreeForAll, 4);
    tournament.start().unwrap();
    assert_eq!(tournament.matches().len(), 1);

    let id = tournament.matches()[0].id;
    tournament
        .record_placements(
            id,
            &[
                (ParticipantId(1), 1),
                (ParticipantId(2), 2),
                (ParticipantId(3), 3),
                (ParticipantId(4), 4),
            ],
        )
        .unwrap();

    let heat = &tournament.matches()[0];
    assert_eq!(heat.state, MatchState::Complete);
    assert_eq!(heat.winner, Some(ParticipantId(1)));

    let points: Vec<_> = heat.placements.iter().map(|p| p.points).collect();
    assert_eq!(points, [10, 6, 3, 1]);

    assert_eq!(tournament.state(), TournamentState::AwaitingReview);
}

#[test]
fn double_elimination_reset_mid_event() {
    let mut tournament = tournament(TournamentKind::DoubleElimination, 16);
    tournament.start().unwrap();

    // Play the first round of the winners bracket.
    let open: Vec<_> = tournament
        .matches()
        .round(Section::Main, 1)
        .map(|m| (m.id, m.entrants[0].entrant.unwrap()))
        .collect();
    for (id, winner) in open {
        tournament.report_result(id, MatchResult::new(winner)).unwrap();
    }
    assert_eq!(tournament.stats().complete, 8);

    // Stale ranks from a previous run are cleared as well.
    let (mut participants, matches) = tournament.into_parts();
    for participant in participants.iter_mut() {
        participant.final_rank = Some(participant.seed);
    }

    let mut tournament = Tournament::resume(
        TournamentId(1),
        TournamentKind::DoubleElimination,
        TournamentOptionValues::new(),
        TournamentState::Underway,
        participants,
        matches,
    )
    .unwrap();

    tournament.reset().unwrap();

    assert_eq!(tournament.state(), TournamentState::Pending);
    assert!(tournament.matches().is_empty());
    assert_eq!(tournament.participants().len(), 16);
    assert!(tournament
        .participants()
        .iter()
        .all(|p| p.final_rank.is_none()));
}
