use std::cmp::Ordering;
use std::collections::HashSet;

use crate::options::{TournamentOptionValues, TournamentOptions};
use crate::standings::{competition_ranks, tally, Record};
use crate::tournament::TournamentKind;
use crate::utils::NumExt;
use crate::{
    participant, Error, FinalRanks, Generation, GenerationStats, Match, MatchId, Matches,
    Participant, ParticipantId, Result, Section, Slot, Standings, System,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper bound of pairings tried while avoiding rematches.
const PAIRING_BUDGET: usize = 100_000;

/// A swiss tournament.
///
/// # Implementation notes
///
/// The first round pairs by seed. All following rounds are generated one at a time: the
/// participants are ordered by score (then seed) and paired top down, skipping opponents they
/// already played. Participants who are not paired in a round receive a bye.
///
/// Ties in the standings are broken by the Buchholz score (the sum of the scores of all
/// opponents), then by wins and finally by seed.
#[derive(Clone, Debug, Default)]
pub struct Swiss {
    options: SwissOptions,
}

impl Swiss {
    pub fn new(options: SwissOptions) -> Self {
        Self { options }
    }

    /// Creates a new `Swiss` system from untyped option values.
    pub fn with_values(values: TournamentOptionValues) -> Result<Self> {
        let options = SwissOptions::try_from(values)?;
        log::debug!("Using options: {:?}", options);

        Ok(Self::new(options))
    }

    /// Returns the [`TournamentOptions`] accepted by this system.
    pub fn options() -> TournamentOptions {
        TournamentOptions::builder()
            .option("rounds", "Number of rounds (0 for the recommended number)", 0u64)
            .option(
                "sequential_pairings",
                "Pair #1 v #2, #3 v #4 in the first round",
                false,
            )
            .option("score_win", "Points per win", 1u64)
            .option("score_loss", "Points per loss", 0u64)
            .option("score_bye", "Points per bye", 1u64)
            .build()
    }

    /// Returns the recommended number of rounds for `participants`.
    #[inline]
    pub fn recommended_rounds(participants: usize) -> u32 {
        participants.ilog2_ceil() as u32
    }

    /// Returns the number of rounds played with `participants`.
    pub fn rounds(&self, participants: usize) -> u32 {
        match self.options.rounds {
            0 => Self::recommended_rounds(participants),
            rounds => rounds,
        }
    }

    /// Returns the last generated round, or 0 if no round was generated.
    pub fn current_round(matches: &Matches) -> u32 {
        matches.last_round(Section::Main).unwrap_or(0).max(0) as u32
    }

    /// Returns `true` if every match of `round` is complete.
    pub fn is_round_complete(matches: &Matches, round: u32) -> bool {
        matches
            .round(Section::Main, round as i32)
            .all(|m| m.is_complete())
    }

    /// Generates the matches of the next round.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RoundIncomplete`] if the current round is not complete and
    /// [`Error::RoundLimitReached`] if all rounds have been generated.
    pub fn next_round(&self, matches: &Matches, participants: &[Participant]) -> Result<Matches> {
        let entrants = participant::active(participants);
        if entrants.len() < 2 {
            return Err(Error::InsufficientParticipants {
                required: 2,
                found: entrants.len(),
            });
        }

        let current = Self::current_round(matches);
        if !Self::is_round_complete(matches, current) {
            return Err(Error::RoundIncomplete { round: current });
        }

        let rounds = self.rounds(entrants.len());
        if current >= rounds {
            return Err(Error::RoundLimitReached { rounds });
        }

        let round = current + 1;
        let pairs = if round == 1 {
            self.initial_pairs(&entrants)
        } else {
            self.pairs(matches, &entrants)
        };

        log::debug!("Generating swiss round {} with {} matches", round, pairs.len());

        let mut next_id = matches.next_id().0;
        let mut new: Matches = pairs
            .into_iter()
            .map(|(a, b)| {
                let id = MatchId(next_id);
                next_id += 1;
                Match::new(
                    id,
                    round as i32,
                    Section::Main,
                    vec![Slot::entrant(a), Slot::entrant(b)],
                )
            })
            .collect();

        new.sequence_from(matches.iter().map(|m| m.play_order).max().unwrap_or(0));
        Ok(new)
    }

    /// Pairs the first round by seed. With an odd number of participants the lowest seed
    /// receives the bye.
    fn initial_pairs(&self, entrants: &[&Participant]) -> Vec<(ParticipantId, ParticipantId)> {
        let playing = entrants.len() - entrants.len() % 2;
        let ids: Vec<ParticipantId> = entrants[..playing].iter().map(|p| p.id).collect();

        if self.options.sequential_pairings {
            ids.chunks(2).map(|pair| (pair[0], pair[1])).collect()
        } else {
            let half = ids.len() / 2;
            (0..half).map(|i| (ids[i], ids[i + half])).collect()
        }
    }

    fn pairs(
        &self,
        matches: &Matches,
        entrants: &[&Participant],
    ) -> Vec<(ParticipantId, ParticipantId)> {
        let mut records = self.records(matches, entrants);
        records.sort_by(|a, b| b.score.cmp(&a.score).then(a.record.seed.cmp(&b.record.seed)));

        if records.len() % 2 == 1 {
            // The lowest placed participant without a bye sits out.
            let index = records
                .iter()
                .rposition(|r| r.record.byes == 0)
                .unwrap_or(records.len() - 1);
            records.remove(index);
        }

        let order: Vec<ParticipantId> = records.iter().map(|r| r.record.participant).collect();

        let mut played = HashSet::new();
        for m in matches.iter() {
            if let [a, b] = m.entrants.as_slice() {
                if let (Some(a), Some(b)) = (a.entrant, b.entrant) {
                    played.insert(key(a, b));
                }
            }
        }

        match pair_without_rematches(&order, &played) {
            Some(pairs) => pairs,
            None => {
                log::warn!(
                    "Cannot avoid rematches in swiss round {}, pairing by score",
                    Self::current_round(matches) + 1
                );

                order.chunks(2).map(|pair| (pair[0], pair[1])).collect()
            }
        }
    }

    /// Computes the swiss records of all `entrants`.
    fn records(&self, matches: &Matches, entrants: &[&Participant]) -> Vec<SwissRecord> {
        let main: Vec<&Match> = matches.iter().filter(|m| m.section == Section::Main).collect();
        let mut records = tally(entrants, main.iter().copied());

        for round in 1..=Self::current_round(matches) {
            let paired: HashSet<ParticipantId> = matches
                .round(Section::Main, round as i32)
                .flat_map(|m| m.participants())
                .collect();

            for record in records.iter_mut() {
                if !paired.contains(&record.participant) {
                    record.byes += 1;
                }
            }
        }

        let score = |record: &Record| {
            record.wins * self.options.score_win
                + record.losses * self.options.score_loss
                + record.byes * self.options.score_bye
        };

        let scores: Vec<(ParticipantId, u64)> =
            records.iter().map(|r| (r.participant, score(r))).collect();
        let score_of = |id: ParticipantId| {
            scores
                .iter()
                .find(|(participant, _)| *participant == id)
                .map(|(_, score)| *score)
                .unwrap_or(0)
        };

        records
            .into_iter()
            .map(|record| SwissRecord {
                score: score(&record),
                buchholz: record.opponents.iter().map(|id| score_of(*id)).sum(),
                record,
            })
            .collect()
    }

    /// Returns the records ordered by score, Buchholz, wins and seed together with their rank.
    fn ranked(&self, matches: &Matches, entrants: &[&Participant]) -> Vec<(SwissRecord, u32)> {
        let mut records = self.records(matches, entrants);
        records.sort_by(|a, b| a.cmp_rank(b).then(a.record.seed.cmp(&b.record.seed)));

        let ranks = competition_ranks(&records, |_, a, b| a.cmp_rank(b) == Ordering::Equal);
        records.into_iter().zip(ranks).collect()
    }
}

impl System for Swiss {
    fn kind(&self) -> TournamentKind {
        TournamentKind::Swiss
    }

    fn generate(&self, participants: &[Participant]) -> Result<Generation> {
        let entrants = participant::active(participants);
        let matches = self.next_round(&Matches::new(), participants)?;

        Ok(Generation {
            stats: GenerationStats {
                rounds: self.rounds(entrants.len()),
                losers_rounds: 0,
                matches: matches.len(),
                byes: entrants.len() % 2,
                groups: 0,
            },
            matches,
        })
    }

    fn is_complete(&self, matches: &Matches, participants: &[Participant]) -> bool {
        let entrants = participants.iter().filter(|p| p.active).count();

        let current = Self::current_round(matches);
        current > 0
            && current >= self.rounds(entrants)
            && matches
                .iter()
                .filter(|m| m.section == Section::Main)
                .all(|m| m.is_complete())
    }

    fn final_ranks(&self, matches: &Matches, participants: &[Participant]) -> Result<FinalRanks> {
        if !self.is_complete(matches, participants) {
            return Err(Error::Incomplete);
        }

        Ok(self.standings(matches, participants)?.ranks())
    }

    fn standings(&self, matches: &Matches, participants: &[Participant]) -> Result<Standings> {
        let entrants = participant::active(participants);

        let mut builder = Standings::builder();
        builder
            .key("Score")
            .key("Wins")
            .key("Losses")
            .key("Byes")
            .key("Buchholz");

        for (r, rank) in self.ranked(matches, &entrants) {
            builder.entry(r.record.participant, rank, |e| {
                e.value(r.score)
                    .value(r.record.wins)
                    .value(r.record.losses)
                    .value(r.record.byes)
                    .value(r.buchholz);
            });
        }

        Ok(builder.build())
    }

    /// Only matches of the current round can be reopened. Later rounds were paired from the
    /// results of earlier rounds.
    fn reopen(&self, matches: &mut Matches, id: MatchId) -> Result<Vec<MatchId>> {
        let m = matches.get_by_id(id).ok_or(Error::UnknownMatch(id))?;

        let current = Self::current_round(matches);
        if m.section == Section::Main && m.round >= 0 && (m.round as u32) < current {
            return Err(Error::RoundClosed {
                id,
                round: m.round as u32,
            });
        }

        matches.reopen(id)
    }
}

#[derive(Clone, Debug)]
struct SwissRecord {
    record: Record,
    score: u64,
    buchholz: u64,
}

impl SwissRecord {
    /// Compares everything except the seed. The better record is `Less`.
    fn cmp_rank(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then(other.buchholz.cmp(&self.buchholz))
            .then(other.record.wins.cmp(&self.record.wins))
    }
}

fn key(a: ParticipantId, b: ParticipantId) -> (ParticipantId, ParticipantId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Pairs `order` top down so that no pair has played before. Every participant is paired with
/// the best placed opponent that still allows the rest of the field to be paired.
fn pair_without_rematches(
    order: &[ParticipantId],
    played: &HashSet<(ParticipantId, ParticipantId)>,
) -> Option<Vec<(ParticipantId, ParticipantId)>> {
    fn search(
        order: &[ParticipantId],
        played: &HashSet<(ParticipantId, ParticipantId)>,
        used: &mut [bool],
        pairs: &mut Vec<(ParticipantId, ParticipantId)>,
        budget: &mut usize,
    ) -> bool {
        let Some(first) = used.iter().position(|used| !used) else {
            return true;
        };

        used[first] = true;
        for candidate in first + 1..order.len() {
            if used[candidate] || played.contains(&key(order[first], order[candidate])) {
                continue;
            }

            if *budget == 0 {
                break;
            }
            *budget -= 1;

            used[candidate] = true;
            pairs.push((order[first], order[candidate]));

            if search(order, played, used, pairs, budget) {
                return true;
            }

            pairs.pop();
            used[candidate] = false;
        }

        used[first] = false;
        false
    }

    let mut used = vec![false; order.len()];
    let mut pairs = Vec::with_capacity(order.len() / 2);
    let mut budget = PAIRING_BUDGET;

    if search(order, played, &mut used, &mut pairs, &mut budget) {
        Some(pairs)
    } else {
        None
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwissOptions {
    /// The number of rounds. 0 uses [`Swiss::recommended_rounds`].
    pub rounds: u32,
    pub sequential_pairings: bool,
    pub score_win: u64,
    pub score_loss: u64,
    pub score_bye: u64,
}

impl Default for SwissOptions {
    fn default() -> Self {
        Self {
            rounds: 0,
            sequential_pairings: false,
            score_win: 1,
            score_loss: 0,
            score_bye: 1,
        }
    }
}

impl TryFrom<TournamentOptionValues> for SwissOptions {
    type Error = crate::options::Error;

    fn try_from(values: TournamentOptionValues) -> std::result::Result<Self, Self::Error> {
        let mut values = values.merge(Swiss::options())?;

        Ok(Self {
            rounds: values.take_u32("rounds")?,
            sequential_pairings: values.take_bool("sequential_pairings")?,
            score_win: values.take_u64("score_win")?,
            score_loss: values.take_u64("score_loss")?,
            score_bye: values.take_u64("score_bye")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::Swiss;
    use crate::standings::EntryValue;
    use crate::tests::play_favorites;
    use crate::{
        option_values, participants, Error, Match, Matches, ParticipantId, Section, Slot, System,
    };

    #[test]
    fn test_recommended_rounds() {
        assert_eq!(Swiss::recommended_rounds(2), 1);
        assert_eq!(Swiss::recommended_rounds(8), 3);
        assert_eq!(Swiss::recommended_rounds(9), 4);
        assert_eq!(Swiss::recommended_rounds(16), 4);
        assert_eq!(Swiss::recommended_rounds(17), 5);
    }

    #[test]
    fn test_swiss_first_round() {
        let participants = participants!(6);
        let matches = Swiss::default().generate(&participants).unwrap().matches;

        let pairs: Vec<_> = matches
            .iter()
            .map(|m| (m.entrants[0].entrant.unwrap().0, m.entrants[1].entrant.unwrap().0))
            .collect();
        assert_eq!(pairs, [(1, 4), (2, 5), (3, 6)]);

        let system =
            Swiss::with_values(option_values!("sequential_pairings" => true)).unwrap();
        let matches = system.generate(&participants).unwrap().matches;
        let pairs: Vec<_> = matches
            .iter()
            .map(|m| (m.entrants[0].entrant.unwrap().0, m.entrants[1].entrant.unwrap().0))
            .collect();
        assert_eq!(pairs, [(1, 2), (3, 4), (5, 6)]);
    }

    #[test]
    fn test_swiss_round_guards() {
        let participants = participants!(4);
        let system = Swiss::default();
        let mut matches = system.generate(&participants).unwrap().matches;

        assert_eq!(
            system.next_round(&matches, &participants),
            Err(Error::RoundIncomplete { round: 1 })
        );

        play_favorites(&system, &mut matches, &participants);
        assert!(Swiss::is_round_complete(&matches, 1));

        let round = system.next_round(&matches, &participants).unwrap();
        matches.extend(round.into_inner());
        play_favorites(&system, &mut matches, &participants);

        assert!(system.is_complete(&matches, &participants));
        assert_eq!(
            system.next_round(&matches, &participants),
            Err(Error::RoundLimitReached { rounds: 2 })
        );
    }

    #[test]
    fn test_swiss_no_rematches() {
        let participants = participants!(9);
        let system = Swiss::default();
        let mut matches = Matches::new();

        for _ in 0..4 {
            let round = system.next_round(&matches, &participants).unwrap();
            assert_eq!(round.len(), 4);
            matches.extend(round.into_inner());
            play_favorites(&system, &mut matches, &participants);
        }

        let mut pairs = HashSet::new();
        for m in matches.iter() {
            let (a, b) = (m.entrants[0].entrant.unwrap(), m.entrants[1].entrant.unwrap());
            assert!(pairs.insert((a.min(b), a.max(b))), "rematch of {} and {}", a, b);
        }

        // Every round has a different participant sitting out.
        let standings = system.standings(&matches, &participants).unwrap();
        let byes: u64 = participants
            .iter()
            .map(|p| match standings.value(p.id, "Byes") {
                Some(EntryValue::U64(byes)) => *byes,
                _ => panic!("missing byes"),
            })
            .sum();
        assert_eq!(byes, 4);
        assert!(participants.iter().all(|p| matches!(
            standings.value(p.id, "Byes"),
            Some(EntryValue::U64(0 | 1))
        )));

        assert!(system.is_complete(&matches, &participants));
        assert!(matches.iter().all(|m| m.section == Section::Main));
    }

    #[test]
    fn test_swiss_standings() {
        let participants = participants!(4);
        let system = Swiss::default();
        let mut matches = system.generate(&participants).unwrap().matches;
        play_favorites(&system, &mut matches, &participants);

        let round = system.next_round(&matches, &participants).unwrap();
        // Winners meet winners.
        assert_eq!(round[0].entrants[0].entrant, Some(ParticipantId(1)));
        assert_eq!(round[0].entrants[1].entrant, Some(ParticipantId(2)));
        matches.extend(round.into_inner());
        play_favorites(&system, &mut matches, &participants);

        // 2 and 3 are tied on score, Buchholz and wins.
        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [1, 2, 2, 4]);
    }

    #[test]
    fn test_swiss_pairs_ignore_foreign_matches() {
        let participants = participants!(4);
        let system = Swiss::default();
        let mut matches = system.generate(&participants).unwrap().matches;
        play_favorites(&system, &mut matches, &participants);

        // A persisted match with a single slot must not break pairing.
        let id = matches.next_id();
        matches.push(Match::new(
            id,
            1,
            Section::Event,
            vec![Slot::entrant(ParticipantId(1))],
        ));

        let round = system.next_round(&matches, &participants).unwrap();
        assert_eq!(round.len(), 2);
        assert_eq!(round[0].entrants[0].entrant, Some(ParticipantId(1)));
        assert_eq!(round[0].entrants[1].entrant, Some(ParticipantId(2)));
    }

    #[test]
    fn test_swiss_reopen_closed_round() {
        let participants = participants!(4);
        let system = Swiss::default();
        let mut matches = system.generate(&participants).unwrap().matches;
        play_favorites(&system, &mut matches, &participants);

        let first = matches[0].id;
        let round = system.next_round(&matches, &participants).unwrap();
        matches.extend(round.into_inner());
        play_favorites(&system, &mut matches, &participants);
        assert!(system.is_complete(&matches, &participants));

        // Round 2 was paired from this result.
        assert_eq!(
            system.reopen(&mut matches, first),
            Err(Error::RoundClosed { id: first, round: 1 })
        );
        assert!(matches[0].is_complete());
        assert!(system.is_complete(&matches, &participants));

        let last = matches[matches.len() - 1].id;
        assert_eq!(system.reopen(&mut matches, last).unwrap(), [last]);
        assert!(!system.is_complete(&matches, &participants));
    }

    #[test]
    fn test_swiss_complete_requires_every_round() {
        let participants = participants!(4);
        let system = Swiss::default();
        let mut matches = system.generate(&participants).unwrap().matches;
        play_favorites(&system, &mut matches, &participants);

        let round = system.next_round(&matches, &participants).unwrap();
        matches.extend(round.into_inner());
        play_favorites(&system, &mut matches, &participants);

        // Bypassing the round guard leaves an earlier round open.
        let first = matches[0].id;
        matches.reopen(first).unwrap();
        assert!(!system.is_complete(&matches, &participants));
        assert_eq!(
            system.final_ranks(&matches, &participants),
            Err(Error::Incomplete)
        );
    }
}
