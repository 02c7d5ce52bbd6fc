use crate::builder::{BracketBuilder, Seat};
use crate::options::{ByeStrategy, GrandFinalsModifier, TournamentOptionValues, TournamentOptions};
use crate::render::Visualization;
use crate::single_elimination::winners_bracket;
use crate::standings::{elimination_exits, elimination_standings, exit_ranks};
use crate::tournament::TournamentKind;
use crate::{
    participant, Error, FinalRanks, Generation, GenerationStats, Match, MatchId, MatchResult,
    Matches, Participant, ParticipantId, Prerequisite, Result, Section, Slot, Standings, System,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A double elimination tournament.
///
/// Participants drop into the losers bracket after their first loss and are eliminated after
/// their second. The champions of both brackets meet in the grand final.
#[derive(Clone, Debug, Default)]
pub struct DoubleElimination {
    options: DoubleEliminationOptions,
}

impl DoubleElimination {
    pub fn new(options: DoubleEliminationOptions) -> Self {
        Self { options }
    }

    /// Creates a new `DoubleElimination` system from untyped option values.
    pub fn with_values(values: TournamentOptionValues) -> Result<Self> {
        let options = DoubleEliminationOptions::try_from(values)?;
        log::debug!("Using options: {:?}", options);

        Ok(Self::new(options))
    }

    /// Returns the [`TournamentOptions`] accepted by this system.
    pub fn options() -> TournamentOptions {
        TournamentOptions::builder()
            .option(
                "grand_finals_modifier",
                "Grand finals (single or double)",
                "double",
            )
            .option(
                "hold_third_place_match",
                "Include a match between the last two losers bracket semi finalists",
                false,
            )
            .option("bye_strategy", "Distribution of byes", "traditional")
            .option("compact_bracket", "Hide byes in the bracket view", false)
            .build()
    }
}

impl System for DoubleElimination {
    fn kind(&self) -> TournamentKind {
        TournamentKind::DoubleElimination
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
            "Creating new DoubleElimination bracket with {} entrants",
            entrants.len()
        );

        let seeds: Vec<ParticipantId> = entrants.iter().map(|p| p.id).collect();

        let mut builder = BracketBuilder::new();
        let bracket = build(&mut builder, &seeds, self.options.third_place_match);
        builder.collapse_byes();

        let mut matches = builder.build(MatchId(1))?;
        matches.sequence();

        log::debug!(
            "Created new DoubleElimination bracket with {} matches",
            matches.len()
        );

        Ok(Generation {
            stats: GenerationStats {
                rounds: bracket.winners_rounds,
                losers_rounds: bracket.losers_rounds,
                matches: matches.len(),
                byes: seeds.len().next_power_of_two() - seeds.len(),
                groups: 0,
            },
            matches,
        })
    }

    fn is_complete(&self, matches: &Matches, _participants: &[Participant]) -> bool {
        is_bracket_complete(matches.iter(), self.options.grand_finals_modifier)
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

    fn report_result(
        &self,
        matches: &mut Matches,
        id: MatchId,
        result: MatchResult,
    ) -> Result<Vec<MatchId>> {
        let mut opened = matches.report_result(id, result)?;

        if let Some(reset) = grand_final_reset(matches, id, self.options.grand_finals_modifier) {
            opened.push(reset);
        }

        Ok(opened)
    }

    fn reopen(&self, matches: &mut Matches, id: MatchId) -> Result<Vec<MatchId>> {
        let reset = matches.reopen(id)?;
        remove_stale_reset(matches);
        Ok(reset)
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

/// The shape of a laid out double elimination bracket.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Bracket {
    pub winners_rounds: u32,
    pub losers_rounds: u32,
}

/// Lays out the winners bracket, the losers bracket, the grand final and the optional third
/// place match for the `seeds`.
pub(crate) fn build(
    builder: &mut BracketBuilder,
    seeds: &[ParticipantId],
    third_place_match: bool,
) -> Bracket {
    let winners = winners_bracket(builder, seeds, Section::Main);
    let k = winners.len();

    let mut losers: Vec<Vec<usize>> = Vec::new();
    if k >= 2 {
        losers.push(
            winners[0]
                .chunks(2)
                .map(|pair| builder.push(-1, Section::Losers, [Seat::Loser(pair[0]), Seat::Loser(pair[1])]))
                .collect(),
        );

        for r in 2..=k {
            let drops = &winners[r - 1];
            let round = -2 * (r as i32 - 1);

            // Reverse every other drop round so rematches happen as late as possible.
            let previous = losers.last().cloned().unwrap_or_default();
            let dropped: Vec<usize> = (0..drops.len())
                .map(|i| {
                    let drop = if r % 2 == 0 { drops.len() - 1 - i } else { i };
                    builder.push(
                        round,
                        Section::Losers,
                        [Seat::Winner(previous[i]), Seat::Loser(drops[drop])],
                    )
                })
                .collect();

            if r < k {
                let consolidation = dropped
                    .chunks(2)
                    .map(|pair| {
                        builder.push(
                            round - 1,
                            Section::Losers,
                            [Seat::Winner(pair[0]), Seat::Winner(pair[1])],
                        )
                    })
                    .collect();

                losers.push(dropped);
                losers.push(consolidation);
            } else {
                losers.push(dropped);
            }
        }
    }

    let winners_champion = Seat::Winner(winners[k - 1][0]);
    let losers_champion = match losers.last() {
        Some(round) => Seat::Winner(round[0]),
        None => Seat::Loser(winners[0][0]),
    };

    builder.push(
        k as i32 + 1,
        Section::GrandFinal,
        [winners_champion, losers_champion],
    );

    if third_place_match && k >= 3 {
        // The losers of the losers semifinal and the losers final.
        if let [.., semifinal, last] = losers.as_slice() {
            builder.push(
                k as i32 + 1,
                Section::ThirdPlace,
                [Seat::Loser(semifinal[0]), Seat::Loser(last[0])],
            );
        }
    }

    Bracket {
        winners_rounds: k as u32,
        losers_rounds: losers.len() as u32,
    }
}

/// Creates the grand final reset after the losers bracket champion won the grand final `id`.
/// Returns the id of the created match.
pub(crate) fn grand_final_reset(
    matches: &mut Matches,
    id: MatchId,
    modifier: GrandFinalsModifier,
) -> Option<MatchId> {
    if modifier != GrandFinalsModifier::Double {
        return None;
    }

    let grand_final = matches.get_by_id(id)?;
    if grand_final.section != Section::GrandFinal
        || grand_final.winner == grand_final.entrants[0].entrant
        || matches.iter().any(|m| m.section == Section::GrandFinalReset)
    {
        return None;
    }

    let entrants = vec![
        Slot {
            entrant: grand_final.entrants[0].entrant,
            source: Some(Prerequisite {
                match_id: id,
                is_loser: true,
            }),
        },
        Slot {
            entrant: grand_final.winner,
            source: Some(Prerequisite {
                match_id: id,
                is_loser: false,
            }),
        },
    ];

    let reset = Match::new(
        matches.next_id(),
        grand_final.round + 1,
        Section::GrandFinalReset,
        entrants,
    );
    let reset_id = reset.id;

    log::debug!("Creating grand final reset {}", reset_id);

    matches.push(reset);
    matches.sequence();
    Some(reset_id)
}

/// Removes a grand final reset whose grand final is no longer complete.
pub(crate) fn remove_stale_reset(matches: &mut Matches) {
    let stale: Vec<MatchId> = matches
        .iter()
        .filter(|m| m.section == Section::GrandFinalReset)
        .filter(|m| {
            m.prerequisites().any(|p| {
                matches
                    .get_by_id(p.match_id)
                    .map(|gf| !gf.is_complete())
                    .unwrap_or(true)
            })
        })
        .map(|m| m.id)
        .collect();

    if !stale.is_empty() {
        log::debug!("Removing grand final reset {:?}", stale);
        matches.retain(|m| !stale.contains(&m.id));
    }
}

/// Returns `true` if every match of the bracket is complete and no grand final reset is
/// still required.
pub(crate) fn is_bracket_complete<'a, I>(matches: I, modifier: GrandFinalsModifier) -> bool
where
    I: Iterator<Item = &'a Match>,
{
    let mut grand_final = None;
    let mut reset = false;
    for m in matches {
        if !m.is_complete() {
            return false;
        }

        match m.section {
            Section::GrandFinal => grand_final = Some(m),
            Section::GrandFinalReset => reset = true,
            _ => (),
        }
    }

    match grand_final {
        Some(gf) => {
            let needs_reset = modifier == GrandFinalsModifier::Double
                && gf.winner != gf.entrants[0].entrant;
            !needs_reset || reset
        }
        None => false,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DoubleEliminationOptions {
    pub grand_finals_modifier: GrandFinalsModifier,
    pub third_place_match: bool,
    pub bye_strategy: ByeStrategy,
    pub compact_bracket: bool,
}

impl Default for DoubleEliminationOptions {
    fn default() -> Self {
        Self {
            grand_finals_modifier: GrandFinalsModifier::Double,
            third_place_match: false,
            bye_strategy: ByeStrategy::Traditional,
            compact_bracket: false,
        }
    }
}

impl TryFrom<TournamentOptionValues> for DoubleEliminationOptions {
    type Error = crate::options::Error;

    fn try_from(values: TournamentOptionValues) -> std::result::Result<Self, Self::Error> {
        let mut values = values.merge(DoubleElimination::options())?;

        Ok(Self {
            grand_finals_modifier: values.take_parsed("grand_finals_modifier")?,
            third_place_match: values.take_bool("hold_third_place_match")?,
            bye_strategy: values.take_parsed("bye_strategy")?,
            compact_bracket: values.take_bool("compact_bracket")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::DoubleElimination;
    use crate::tests::{next_open, play_favorites, play_with};
    use crate::{
        option_values, participants, MatchResult, MatchState, ParticipantId, Section, System,
    };

    fn system(modifier: &str) -> DoubleElimination {
        DoubleElimination::with_values(option_values!("grand_finals_modifier" => modifier))
            .unwrap()
    }

    #[test]
    fn test_double_elimination_two() {
        let participants = participants!(2);
        let system = system("double");
        let generation = system.generate(&participants).unwrap();
        let matches = &generation.matches;

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].section, Section::GrandFinal);
        assert_eq!(matches[1].entrants[1].source.unwrap().match_id, matches[0].id);
        assert!(matches[1].entrants[1].source.unwrap().is_loser);
    }

    #[test]
    fn test_double_elimination_layout() {
        let participants = participants!(8);
        let generation = system("double").generate(&participants).unwrap();
        let matches = &generation.matches;

        assert_eq!(generation.stats.rounds, 3);
        assert_eq!(generation.stats.losers_rounds, 4);
        // 7 winners, 6 losers and the grand final.
        assert_eq!(matches.len(), 14);

        let losers: Vec<_> = matches.iter().filter(|m| m.section == Section::Losers).collect();
        let rounds: Vec<_> = losers.iter().map(|m| m.round).collect();
        assert_eq!(rounds, [-1, -1, -2, -2, -3, -4]);

        // Every slot of a losers match is fed by another match.
        assert!(losers
            .iter()
            .all(|m| m.entrants.iter().all(|slot| slot.source.is_some())));
    }

    #[test]
    fn test_double_elimination_byes() {
        for n in 3..=20 {
            let participants = participants!(n);
            let generation = system("single").generate(&participants).unwrap();

            // Every participant but the champion loses twice, except for the grand final.
            assert_eq!(generation.matches.len(), 2 * n as usize - 2);
            assert!(generation
                .matches
                .iter()
                .all(|m| m.entrants.len() == 2 && !m.entrants.iter().any(|s| s.is_empty())));
        }
    }

    #[test]
    fn test_double_elimination_winners_champion() {
        let participants = participants!(4);
        let system = system("double");
        let mut matches = system.generate(&participants).unwrap().matches;

        play_favorites(&system, &mut matches, &participants);
        assert!(system.is_complete(&matches, &participants));
        assert!(!matches.iter().any(|m| m.section == Section::GrandFinalReset));

        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [1, 2, 3, 4]);
    }

    #[test]
    fn test_double_elimination_grand_final_reset() {
        let participants = participants!(4);
        let system = system("double");
        let mut matches = system.generate(&participants).unwrap().matches;

        // Favorites win until the grand final.
        while let Some((id, a, b)) = next_open(&matches) {
            let m = matches.get_by_id(id).unwrap();
            if m.section == Section::GrandFinal {
                break;
            }

            let winner = if a < b { a } else { b };
            system
                .report_result(&mut matches, id, MatchResult::new(winner))
                .unwrap();
        }

        let grand_final = matches
            .iter()
            .find(|m| m.section == Section::GrandFinal)
            .unwrap();
        let id = grand_final.id;
        assert_eq!(grand_final.entrants[0].entrant, Some(ParticipantId(1)));
        assert_eq!(grand_final.entrants[1].entrant, Some(ParticipantId(2)));

        let opened = system
            .report_result(&mut matches, id, MatchResult::new(ParticipantId(2)))
            .unwrap();
        assert_eq!(opened.len(), 1);
        assert!(!system.is_complete(&matches, &participants));

        let reset = matches.get_by_id(opened[0]).unwrap();
        assert_eq!(reset.section, Section::GrandFinalReset);
        assert_eq!(reset.state, MatchState::Open);

        // Reopening the grand final removes the reset.
        system.reopen(&mut matches, id).unwrap();
        assert!(!matches.iter().any(|m| m.section == Section::GrandFinalReset));

        system
            .report_result(&mut matches, id, MatchResult::new(ParticipantId(2)))
            .unwrap();
        let reset = matches
            .iter()
            .find(|m| m.section == Section::GrandFinalReset)
            .unwrap()
            .id;
        system
            .report_result(&mut matches, reset, MatchResult::new(ParticipantId(2)))
            .unwrap();

        assert!(system.is_complete(&matches, &participants));
        let ranks = system.final_ranks(&matches, &participants).unwrap();
        assert_eq!(ranks[&ParticipantId(2)], 1);
        assert_eq!(ranks[&ParticipantId(1)], 2);
    }

    #[test]
    fn test_double_elimination_single_grand_final() {
        let participants = participants!(4);
        let system = system("single");
        let mut matches = system.generate(&participants).unwrap().matches;

        // The second slot always wins, so the losers bracket champion takes the grand final.
        play_with(&system, &mut matches, &participants, |_, _| false);

        assert!(system.is_complete(&matches, &participants));
        assert!(!matches.iter().any(|m| m.section == Section::GrandFinalReset));
    }

    #[test]
    fn test_double_elimination_third_place() {
        let participants = participants!(8);
        let system = DoubleElimination::with_values(option_values!(
            "hold_third_place_match" => true
        ))
        .unwrap();
        let mut matches = system.generate(&participants).unwrap().matches;

        let third_place: Vec<_> = matches
            .iter()
            .filter(|m| m.section == Section::ThirdPlace)
            .collect();
        assert_eq!(third_place.len(), 1);

        // Fed by the losers semifinal (round -3) and the losers final (round -4).
        let feeders: Vec<i32> = third_place[0]
            .prerequisites()
            .map(|p| matches.get_by_id(p.match_id).unwrap().round)
            .collect();
        assert_eq!(feeders, [-3, -4]);

        play_favorites(&system, &mut matches, &participants);
        let ranks = system.final_ranks(&matches, &participants).unwrap();

        // 4 loses the losers semifinal to 3, who loses the losers final to 2 and wins the
        // third place match against 4.
        let third_place = matches
            .iter()
            .find(|m| m.section == Section::ThirdPlace)
            .unwrap();
        assert_eq!(third_place.winner, Some(ParticipantId(3)));
        assert_eq!(third_place.loser, Some(ParticipantId(4)));

        let values: Vec<_> = ranks.values().copied().collect();
        assert_eq!(values, [1, 2, 3, 4, 5, 5, 7, 7]);
    }
}
