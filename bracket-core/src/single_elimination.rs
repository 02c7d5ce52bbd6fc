use crate::builder::{BracketBuilder, Seat};
use crate::options::{ByeStrategy, TournamentOptionValues, TournamentOptions};
use crate::render::Visualization;
use crate::standings::{elimination_exits, elimination_standings, exit_ranks};
use crate::tournament::TournamentKind;
use crate::utils::NumExt;
use crate::{
    participant, Error, FinalRanks, Generation, GenerationStats, MatchId, Matches, Participant,
    ParticipantId, Result, Section, Standings, System,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single elimination tournament.
#[derive(Clone, Debug, Default)]
pub struct SingleElimination {
    options: SingleEliminationOptions,
}

impl SingleElimination {
    /// Creates a new `SingleElimination` system using the given `options`.
    pub fn new(options: SingleEliminationOptions) -> Self {
        Self { options }
    }

    /// Creates a new `SingleElimination` system from untyped option values.
    pub fn with_values(values: TournamentOptionValues) -> Result<Self> {
        let options = SingleEliminationOptions::try_from(values)?;
        log::debug!("Using options: {:?}", options);

        Ok(Self::new(options))
    }

    /// Returns the [`TournamentOptions`] accepted by this system.
    pub fn options() -> TournamentOptions {
        TournamentOptions::builder()
            .option(
                "hold_third_place_match",
                "Include a match for the third place",
                false,
            )
            .option("bye_strategy", "Distribution of byes", "traditional")
            .option("compact_bracket", "Hide byes in the bracket view", false)
            .build()
    }

    /// Returns the number of rounds required for `participants`.
    #[inline]
    pub fn rounds(participants: usize) -> u32 {
        participants.next_power_of_two().ilog2_ceil() as u32
    }
}

impl System for SingleElimination {
    fn kind(&self) -> TournamentKind {
        TournamentKind::SingleElimination
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
            "Creating new SingleElimination bracket with {} entrants",
            entrants.len()
        );

        let seeds: Vec<ParticipantId> = entrants.iter().map(|p| p.id).collect();

        let mut builder = BracketBuilder::new();
        let rounds = winners_bracket(&mut builder, &seeds, Section::Main);
        if self.options.third_place_match {
            third_place_match(&mut builder, &rounds);
        }

        builder.collapse_byes();

        let mut matches = builder.build(MatchId(1))?;
        matches.sequence();

        log::debug!(
            "Created new SingleElimination bracket with {} matches",
            matches.len()
        );

        Ok(Generation {
            stats: GenerationStats {
                rounds: rounds.len() as u32,
                losers_rounds: 0,
                matches: matches.len(),
                byes: seeds.len().next_power_of_two() - seeds.len(),
                groups: 0,
            },
            matches,
        })
    }

    fn is_complete(&self, matches: &Matches, _participants: &[Participant]) -> bool {
        !matches.is_empty() && matches.iter().all(|m| m.is_complete())
    }

    fn final_ranks(&self, matches: &Matches, participants: &[Participant]) -> Result<FinalRanks> {
        if !self.is_complete(matches, participants) {
            return Err(Error::Incomplete);
        }

        let entrants = participant::active(participants);
        let matches: Vec<_> = matches.iter().collect();
        let exits = elimination_exits(&matches, &entrants);

        Ok(exit_ranks(&exits, &entrants).into_iter().collect())
    }

    fn standings(&self, matches: &Matches, participants: &[Participant]) -> Result<Standings> {
        let entrants = participant::active(participants);
        let matches: Vec<_> = matches.iter().collect();

        Ok(elimination_standings(&matches, &entrants))
    }

    fn visualize(&self, matches: &Matches, participants: &[Participant]) -> Visualization {
        Visualization::new(
            self.kind(),
            matches,
            participants,
            self.options.compact_bracket,
        )
    }
}

/// Returns the standard bracket positions for a bracket of `size` (a power of two): The seed
/// placed at every first round position, starting at 1. Seeds 1 and 2 can only meet in the
/// final.
///
/// `[1, 8, 4, 5, 2, 7, 3, 6]` for a bracket of 8.
pub fn seed_positions(size: usize) -> Vec<usize> {
    let mut positions = vec![1];
    while positions.len() < size {
        let len = positions.len() * 2;
        positions = positions
            .iter()
            .flat_map(|&seed| [seed, len + 1 - seed])
            .collect();
    }

    positions
}

/// Lays out a full winners bracket for the `seeds` (ordered by seed), with byes in place of
/// missing seeds. Returns the node positions of every round.
pub(crate) fn winners_bracket(
    builder: &mut BracketBuilder,
    seeds: &[ParticipantId],
    section: Section,
) -> Vec<Vec<usize>> {
    let seat = |seed: usize| match seeds.get(seed - 1) {
        Some(id) => Seat::Entrant(*id),
        None => Seat::Bye,
    };

    let positions = seed_positions(seeds.len().next_power_of_two());
    let mut rounds: Vec<Vec<usize>> = vec![positions
        .chunks(2)
        .map(|pair| builder.push(1, section, [seat(pair[0]), seat(pair[1])]))
        .collect()];

    while let Some(previous) = rounds.last().filter(|round| round.len() > 1) {
        let round = rounds.len() as i32 + 1;
        let next = previous
            .chunks(2)
            .map(|pair| builder.push(round, section, [Seat::Winner(pair[0]), Seat::Winner(pair[1])]))
            .collect();

        rounds.push(next);
    }

    rounds
}

/// Adds a match between the losers of the two semi finals.
pub(crate) fn third_place_match(builder: &mut BracketBuilder, rounds: &[Vec<usize>]) {
    // At least 3 participants (two rounds) are required.
    if rounds.len() < 2 {
        return;
    }

    let semi_finals = &rounds[rounds.len() - 2];
    builder.push(
        rounds.len() as i32,
        Section::ThirdPlace,
        [Seat::Loser(semi_finals[0]), Seat::Loser(semi_finals[1])],
    );
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SingleEliminationOptions {
    pub third_place_match: bool,
    pub bye_strategy: ByeStrategy,
    pub compact_bracket: bool,
}

impl Default for SingleEliminationOptions {
    fn default() -> Self {
        Self {
            third_place_match: false,
            bye_strategy: ByeStrategy::Traditional,
            compact_bracket: false,
        }
    }
}

impl TryFrom<TournamentOptionValues> for SingleEliminationOptions {
    type Error = crate::options::Error;

    fn try_from(values: TournamentOptionValues) -> std::result::Result<Self, Self::Error> {
        let mut values = values.merge(SingleElimination::options())?;

        Ok(Self {
            third_place_match: values.take_bool("hold_third_place_match")?,
            bye_strategy: values.take_parsed("bye_strategy")?,
            compact_bracket: values.take_bool("compact_bracket")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{seed_positions, SingleElimination};
    use crate::tests::{next_open, play_favorites};
    use crate::{
        option_values, participants, Error, MatchId, MatchResult, MatchState, ParticipantId,
        Section, Slot, System,
    };

    fn system(third_place: bool) -> SingleElimination {
        SingleElimination::with_values(option_values!("hold_third_place_match" => third_place))
            .unwrap()
    }

    #[test]
    fn test_seed_positions() {
        assert_eq!(seed_positions(1), [1]);
        assert_eq!(seed_positions(2), [1, 2]);
        assert_eq!(seed_positions(4), [1, 4, 2, 3]);
        assert_eq!(seed_positions(8), [1, 8, 4, 5, 2, 7, 3, 6]);
        assert_eq!(
            seed_positions(16),
            [1, 16, 8, 9, 4, 13, 5, 12, 2, 15, 7, 10, 3, 14, 6, 11]
        );
    }

    #[test]
    fn test_single_elimination_insufficient() {
        let participants = participants!(1);
        assert_eq!(
            system(false).generate(&participants),
            Err(Error::InsufficientParticipants {
                required: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_single_elimination_two() {
        let participants = participants!(2);
        let generation = system(true).generate(&participants).unwrap();

        assert_eq!(generation.stats.rounds, 1);
        assert_eq!(generation.matches.len(), 1);
        assert_eq!(generation.matches[0].state, MatchState::Open);
    }

    #[test]
    fn test_single_elimination_byes() {
        let participants = participants!(5);
        let generation = system(false).generate(&participants).unwrap();
        let matches = &generation.matches;

        assert_eq!(generation.stats.rounds, 3);
        assert_eq!(generation.stats.byes, 3);
        assert_eq!(matches.len(), 4);

        // Only 4 vs 5 is played in the first round.
        let first_round: Vec<_> = matches.round(Section::Main, 1).collect();
        assert_eq!(first_round.len(), 1);
        assert_eq!(
            first_round[0].entrants,
            [Slot::entrant(ParticipantId(4)), Slot::entrant(ParticipantId(5))]
        );

        // Seed 1 waits for the winner of 4 vs 5, 2 and 3 play directly.
        let second_round: Vec<_> = matches.round(Section::Main, 2).collect();
        assert_eq!(
            second_round[0].entrants,
            [Slot::entrant(ParticipantId(1)), Slot::winner_of(first_round[0].id)]
        );
        assert_eq!(second_round[1].state, MatchState::Open);

        assert!(matches.iter().all(|m| m.entrants.len() == 2));
    }

    #[test]
    fn test_single_elimination_match_count() {
        for n in 2..=33 {
            let participants = participants!(n);
            let generation = system(false).generate(&participants).unwrap();

            assert_eq!(generation.matches.len(), n as usize - 1);
            assert_eq!(
                generation.stats.rounds,
                (n as usize).next_power_of_two().trailing_zeros()
            );
        }
    }

    #[test]
    fn test_single_elimination_final_ranks() {
        let participants = participants!(8);
        let system = system(true);
        let mut matches = system.generate(&participants).unwrap().matches;

        assert_eq!(
            system.final_ranks(&matches, &participants),
            Err(Error::Incomplete)
        );

        play_favorites(&system, &mut matches, &participants);
        assert!(system.is_complete(&matches, &participants));

        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [1, 2, 3, 4, 5, 5, 5, 5]);
    }

    #[test]
    fn test_single_elimination_reopen() {
        let participants = participants!(4);
        let system = system(false);
        let mut matches = system.generate(&participants).unwrap().matches;

        play_favorites(&system, &mut matches, &participants);
        let semi_final = matches
            .iter()
            .find(|m| m.round == 1 && m.contains(ParticipantId(1)))
            .unwrap()
            .id;

        let reset = system.reopen(&mut matches, semi_final).unwrap();
        assert_eq!(reset.len(), 2);
        assert!(!system.is_complete(&matches, &participants));

        // 4 wins instead, the final is played again.
        system
            .report_result(&mut matches, semi_final, MatchResult::new(ParticipantId(4)))
            .unwrap();
        let (id, a, b) = next_open(&matches).unwrap();
        assert_eq!((a, b), (ParticipantId(4), ParticipantId(2)));

        system
            .report_result(&mut matches, id, MatchResult::new(ParticipantId(4)))
            .unwrap();
        let ranks = system.final_ranks(&matches, &participants).unwrap();
        assert_eq!(ranks[&ParticipantId(4)], 1);
        assert_eq!(ranks[&ParticipantId(1)], 3);
        assert_eq!(
            system.report_result(&mut matches, MatchId(99), MatchResult::new(ParticipantId(1))),
            Err(Error::UnknownMatch(MatchId(99)))
        );
    }
}
