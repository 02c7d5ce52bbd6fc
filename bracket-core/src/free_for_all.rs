use std::cmp::Reverse;
use std::collections::HashMap;

use crate::options::{PointsTable, TournamentOptionValues, TournamentOptions};
use crate::standings::competition_ranks;
use crate::tournament::TournamentKind;
use crate::utils::snake;
use crate::{
    participant, Error, FinalRanks, Generation, GenerationStats, Match, MatchId, MatchResult,
    Matches, Participant, ParticipantId, Placement, Result, Section, Slot, Standings, System,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A free-for-all tournament.
///
/// Every round splits the remaining field into heats of up to `players_per_match`
/// participants. A heat is resolved by the finishing position of every participant and the
/// best of every heat advance into the next round. The round with a single heat is the final.
#[derive(Clone, Debug, Default)]
pub struct FreeForAll {
    options: FreeForAllOptions,
}

impl FreeForAll {
    pub fn new(options: FreeForAllOptions) -> Self {
        Self { options }
    }

    /// Creates a new `FreeForAll` system from untyped option values.
    pub fn with_values(values: TournamentOptionValues) -> Result<Self> {
        let options = FreeForAllOptions::try_from(values)?;
        log::debug!("Using options: {:?}", options);

        Ok(Self::new(options))
    }

    /// Returns the [`TournamentOptions`] accepted by this system.
    pub fn options() -> TournamentOptions {
        TournamentOptions::builder()
            .option("players_per_match", "Participants per heat", 4u64)
            .option(
                "advance_per_match",
                "Participants advancing from every heat",
                2u64,
            )
            .option(
                "points",
                "Points awarded per finishing position",
                &PointsTable::default(),
            )
            .build()
    }

    /// Returns the last opened round, or 0 if no round was opened.
    pub fn current_round(matches: &Matches) -> u32 {
        matches.last_round(Section::Main).unwrap_or(0).max(0) as u32
    }

    /// Returns `true` if all heats of `round` have recorded placements.
    pub fn is_round_complete(matches: &Matches, round: u32) -> bool {
        let mut heats = matches.round(Section::Main, round as i32).peekable();
        heats.peek().is_some() && heats.all(Match::is_complete)
    }

    /// Records the finishing `placements` of the heat `id`.
    pub fn record_placements(
        &self,
        matches: &mut Matches,
        id: MatchId,
        placements: &[(ParticipantId, u32)],
    ) -> Result<Vec<MatchId>> {
        matches.record_placements(id, placements, &self.options.points)
    }

    /// Creates the heats of the next round from the advancing participants of the completed
    /// current round. Returns the new matches, which must be appended to `matches`.
    pub fn open_next_round(
        &self,
        matches: &Matches,
        participants: &[Participant],
    ) -> Result<Matches> {
        let round = Self::current_round(matches);
        if !Self::is_round_complete(matches, round) {
            return Err(Error::RoundIncomplete { round });
        }

        let heats: Vec<&Match> = matches.round(Section::Main, round as i32).collect();
        if heats.len() == 1 {
            return Err(Error::NoFurtherRounds);
        }

        let seed_of = |id: ParticipantId| {
            participant::find(participants, id)
                .map(|p| p.seed)
                .unwrap_or(u32::MAX)
        };

        let mut advancing: Vec<&Placement> = heats
            .iter()
            .flat_map(|heat| {
                let count = (self.options.advance_per_match as usize)
                    .min(heat.placements.len().saturating_sub(1));
                heat.placements.iter().take(count)
            })
            .collect();
        advancing.sort_by_key(|p| (p.position, Reverse(p.points), seed_of(p.participant)));

        let field: Vec<ParticipantId> = advancing.iter().map(|p| p.participant).collect();

        log::debug!(
            "Opening round {} with {} of {} participants",
            round + 1,
            field.len(),
            heats.iter().map(|heat| heat.placements.len()).sum::<usize>()
        );

        let mut next = self.heats(&field, round + 1, matches.next_id());
        let last_played = matches.iter().map(|m| m.play_order).max().unwrap_or(0);
        next.sequence_from(last_played);

        Ok(next)
    }

    /// Splits the `field` (ordered best first) into the heats of `round`.
    fn heats(&self, field: &[ParticipantId], round: u32, first_id: MatchId) -> Matches {
        let players = self.options.players_per_match as usize;
        let count = (field.len() + players - 1) / players;

        snake(field, count)
            .into_iter()
            .enumerate()
            .map(|(index, heat)| {
                Match::new(
                    MatchId(first_id.0 + index as u64),
                    round as i32,
                    Section::Main,
                    heat.into_iter().map(Slot::entrant).collect(),
                )
            })
            .collect()
    }

    /// Ranks all participants by the round they reached, then by their finishing position in
    /// that round and finally by the total points of all their heats.
    pub fn calculate_standings(&self, matches: &Matches, participants: &[Participant]) -> Standings {
        #[derive(Default)]
        struct Progress {
            round: i32,
            position: Option<u32>,
            points: i64,
            heat_wins: u64,
        }

        let entrants = participant::active(participants);
        let mut progress: HashMap<ParticipantId, Progress> = entrants
            .iter()
            .map(|p| (p.id, Progress::default()))
            .collect();

        for m in matches.iter() {
            for id in m.participants() {
                if let Some(entry) = progress.get_mut(&id) {
                    if m.round > entry.round {
                        entry.round = m.round;
                        entry.position = None;
                    }
                }
            }

            for placement in &m.placements {
                if let Some(entry) = progress.get_mut(&placement.participant) {
                    entry.points += placement.points;
                    if placement.position == 1 {
                        entry.heat_wins += 1;
                    }
                    if m.round == entry.round {
                        entry.position = Some(placement.position);
                    }
                }
            }
        }

        let key = |p: &Participant| {
            let entry = &progress[&p.id];
            (
                Reverse(entry.round),
                entry.position.unwrap_or(u32::MAX),
                Reverse(entry.points),
            )
        };

        let mut order = entrants;
        order.sort_by_key(|&p| (key(p), p.seed));
        let ranks = competition_ranks(&order, |_, &a, &b| key(a) == key(b));

        let mut builder = Standings::builder();
        builder
            .key("Round")
            .key("Position")
            .key("Points")
            .key("Heat Wins");

        for (p, rank) in order.into_iter().zip(ranks) {
            let entry = &progress[&p.id];
            builder.entry(p.id, rank, |e| {
                e.value(entry.round.max(0) as u64)
                    .value(u64::from(entry.position.unwrap_or(0)))
                    .value(entry.points)
                    .value(entry.heat_wins);
            });
        }

        builder.build()
    }
}

impl System for FreeForAll {
    fn kind(&self) -> TournamentKind {
        TournamentKind::FreeForAll
    }

    fn generate(&self, participants: &[Participant]) -> Result<Generation> {
        let entrants = participant::active(participants);
        if entrants.len() < 2 {
            return Err(Error::InsufficientParticipants {
                required: 2,
                found: entrants.len(),
            });
        }

        log::debug!(
            "Creating new FreeForAll bracket with {} entrants",
            entrants.len()
        );

        let field: Vec<ParticipantId> = entrants.iter().map(|p| p.id).collect();
        let mut matches = self.heats(&field, 1, MatchId(1));
        matches.sequence();

        Ok(Generation {
            stats: GenerationStats {
                rounds: 1,
                losers_rounds: 0,
                matches: matches.len(),
                byes: 0,
                groups: 0,
            },
            matches,
        })
    }

    /// The tournament is complete once the final heat and every heat before it have recorded
    /// placements.
    fn is_complete(&self, matches: &Matches, _participants: &[Participant]) -> bool {
        let round = Self::current_round(matches);
        matches.round(Section::Main, round as i32).count() == 1
            && matches
                .iter()
                .filter(|m| m.section == Section::Main)
                .all(Match::is_complete)
    }

    fn final_ranks(&self, matches: &Matches, participants: &[Participant]) -> Result<FinalRanks> {
        if !self.is_complete(matches, participants) {
            return Err(Error::Incomplete);
        }

        Ok(self.calculate_standings(matches, participants).ranks())
    }

    fn standings(&self, matches: &Matches, participants: &[Participant]) -> Result<Standings> {
        Ok(self.calculate_standings(matches, participants))
    }

    fn report_result(
        &self,
        _matches: &mut Matches,
        id: MatchId,
        _result: MatchResult,
    ) -> Result<Vec<MatchId>> {
        Err(Error::InvalidResult(format!(
            "heat {} is resolved by placements, not by a winner",
            id
        )))
    }

    /// Heats of earlier rounds cannot be reopened once the next round was filled from them.
    fn reopen(&self, matches: &mut Matches, id: MatchId) -> Result<Vec<MatchId>> {
        let heat = matches.get_by_id(id).ok_or(Error::UnknownMatch(id))?;

        let current = Self::current_round(matches);
        if heat.section == Section::Main && heat.round >= 0 && (heat.round as u32) < current {
            return Err(Error::RoundClosed {
                id,
                round: heat.round as u32,
            });
        }

        matches.reopen(id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FreeForAllOptions {
    pub players_per_match: u32,
    pub advance_per_match: u32,
    pub points: PointsTable,
}

impl Default for FreeForAllOptions {
    fn default() -> Self {
        Self {
            players_per_match: 4,
            advance_per_match: 2,
            points: PointsTable::default(),
        }
    }
}

impl TryFrom<TournamentOptionValues> for FreeForAllOptions {
    type Error = crate::options::Error;

    fn try_from(values: TournamentOptionValues) -> std::result::Result<Self, Self::Error> {
        let mut values = values.merge(FreeForAll::options())?;

        let players_per_match = values.take_u32("players_per_match")?;
        if players_per_match < 3 {
            return Err(crate::options::Error::out_of_range(
                "players_per_match",
                players_per_match,
                "at least 3",
            ));
        }

        let advance_per_match = values.take_u32("advance_per_match")?;
        if advance_per_match == 0 || advance_per_match >= players_per_match {
            return Err(crate::options::Error::out_of_range(
                "advance_per_match",
                advance_per_match,
                "at least 1 and less than players_per_match",
            ));
        }

        Ok(Self {
            players_per_match,
            advance_per_match,
            points: values.take_points_table("points")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::FreeForAll;
    use crate::{
        option_values, participants, Error, MatchId, MatchResult, MatchState, Matches,
        ParticipantId, System,
    };

    /// Places the participants of every heat of `round` in seed order.
    fn place_by_seed(system: &FreeForAll, matches: &mut Matches, round: i32) {
        let heats: Vec<MatchId> = matches
            .iter()
            .filter(|m| m.round == round)
            .map(|m| m.id)
            .collect();

        for id in heats {
            let mut order: Vec<ParticipantId> =
                matches.get_by_id(id).unwrap().participants().collect();
            order.sort();

            let placements: Vec<_> = order
                .into_iter()
                .enumerate()
                .map(|(index, id)| (id, index as u32 + 1))
                .collect();
            system.record_placements(matches, id, &placements).unwrap();
        }
    }

    #[test]
    fn test_free_for_all_single_heat() {
        let participants = participants!(4);
        let system = FreeForAll::default();
        let mut matches = system.generate(&participants).unwrap().matches;

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].entrants.len(), 4);
        assert_eq!(matches[0].state, MatchState::Open);

        assert_eq!(
            system.report_result(&mut matches, MatchId(1), MatchResult::new(ParticipantId(1))),
            Err(Error::InvalidResult(
                "heat 1 is resolved by placements, not by a winner".to_owned()
            ))
        );

        let placements = [
            (ParticipantId(1), 1),
            (ParticipantId(2), 2),
            (ParticipantId(3), 3),
            (ParticipantId(4), 4),
        ];
        system
            .record_placements(&mut matches, MatchId(1), &placements)
            .unwrap();

        let points: Vec<_> = matches[0].placements.iter().map(|p| p.points).collect();
        assert_eq!(points, [10, 6, 3, 1]);
        assert_eq!(matches[0].winner, Some(ParticipantId(1)));
        assert!(system.is_complete(&matches, &participants));
        assert_eq!(
            system.open_next_round(&matches, &participants),
            Err(Error::NoFurtherRounds)
        );

        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [1, 2, 3, 4]);
    }

    #[test]
    fn test_free_for_all_rounds() {
        let participants = participants!(10);
        let system = FreeForAll::default();
        let mut matches = system.generate(&participants).unwrap().matches;

        let sizes: Vec<_> = matches.iter().map(|m| m.entrants.len()).collect();
        assert_eq!(sizes, [3, 3, 4]);
        assert_eq!(
            system.open_next_round(&matches, &participants),
            Err(Error::RoundIncomplete { round: 1 })
        );

        place_by_seed(&system, &mut matches, 1);
        assert!(FreeForAll::is_round_complete(&matches, 1));
        assert!(!system.is_complete(&matches, &participants));

        let next = system.open_next_round(&matches, &participants).unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next[0].id, MatchId(4));
        let field: Vec<Vec<u64>> = next
            .iter()
            .map(|m| m.participants().map(|id| id.0).collect())
            .collect();
        assert_eq!(field, [vec![1, 4, 5], vec![2, 3, 6]]);
        matches.extend(next.into_inner());

        place_by_seed(&system, &mut matches, 2);
        let final_heat = system.open_next_round(&matches, &participants).unwrap();
        assert_eq!(final_heat.len(), 1);
        matches.extend(final_heat.into_inner());
        assert_eq!(
            system.open_next_round(&matches, &participants),
            Err(Error::RoundIncomplete { round: 3 })
        );

        place_by_seed(&system, &mut matches, 3);
        assert!(system.is_complete(&matches, &participants));

        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [1, 2, 3, 4, 5, 5, 7, 7, 7, 10]);
    }

    #[test]
    fn test_free_for_all_reopen_closed_round() {
        let participants = participants!(8);
        let system = FreeForAll::default();
        let mut matches = system.generate(&participants).unwrap().matches;
        place_by_seed(&system, &mut matches, 1);

        let next = system.open_next_round(&matches, &participants).unwrap();
        let final_heat = next[0].id;
        matches.extend(next.into_inner());
        place_by_seed(&system, &mut matches, 2);
        assert!(system.is_complete(&matches, &participants));

        // The final heat was filled from the first round.
        assert_eq!(
            system.reopen(&mut matches, MatchId(1)),
            Err(Error::RoundClosed {
                id: MatchId(1),
                round: 1
            })
        );
        assert_eq!(matches[0].state, MatchState::Complete);
        assert!(system.is_complete(&matches, &participants));

        assert_eq!(
            system.reopen(&mut matches, final_heat).unwrap(),
            [final_heat]
        );
        assert!(!system.is_complete(&matches, &participants));

        place_by_seed(&system, &mut matches, 2);
        assert!(system.is_complete(&matches, &participants));

        // An open heat of an earlier round blocks completion.
        matches.reopen(MatchId(2)).unwrap();
        assert!(!system.is_complete(&matches, &participants));
        assert_eq!(
            system.final_ranks(&matches, &participants),
            Err(Error::Incomplete)
        );
    }

    #[test]
    fn test_free_for_all_options() {
        assert!(matches!(
            FreeForAll::with_values(option_values!("players_per_match" => 2u64)),
            Err(Error::InvalidOptions(_))
        ));
        assert!(matches!(
            FreeForAll::with_values(option_values!("advance_per_match" => 4u64)),
            Err(Error::InvalidOptions(_))
        ));

        let points = std::collections::BTreeMap::from([
            ("1".to_owned(), 25),
            ("default".to_owned(), 1),
        ]);
        let system = FreeForAll::with_values(option_values!("points" => points)).unwrap();
        assert_eq!(system.options.points.points(1), 25);
        assert_eq!(system.options.points.points(7), 1);
    }
}
