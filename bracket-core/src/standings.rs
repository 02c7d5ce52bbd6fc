//! Standings and the ranking primitives shared by all formats.
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::iter::FusedIterator;

use crate::options::RankedBy;
use crate::{FinalRanks, Match, MatchState, Participant, ParticipantId, Section};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A ranked list of participants with format specific statistics. Every entry holds one value
/// per key.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Standings {
    entries: Vec<Entry>,
    keys: Vec<Cow<'static, str>>,
}

impl Standings {
    #[inline]
    pub fn builder() -> Builder {
        Builder::new()
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self,
            next: 0,
        }
    }

    #[inline]
    pub fn keys(&self) -> Keys<'_> {
        Keys {
            inner: self,
            next: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry of `participant`.
    pub fn get(&self, participant: ParticipantId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.participant == participant)
    }

    /// Returns the value of the column `key` for `participant`.
    pub fn value(&self, participant: ParticipantId, key: &str) -> Option<&EntryValue> {
        let column = self.keys.iter().position(|k| k == key)?;
        self.get(participant)?.values.get(column)
    }

    /// Returns the rank of every entry.
    pub fn ranks(&self) -> FinalRanks {
        self.entries
            .iter()
            .map(|entry| (entry.participant, entry.rank))
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Builder {
    keys: Vec<Cow<'static, str>>,
    entries: Vec<Entry>,
}

impl Builder {
    #[inline]
    pub const fn new() -> Self {
        Self {
            keys: Vec::new(),
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn key<K>(&mut self, key: K) -> &mut Self
    where
        K: Into<Cow<'static, str>>,
    {
        self.keys.push(key.into());
        self
    }

    pub fn entry<F>(&mut self, participant: ParticipantId, rank: u32, f: F) -> &mut Self
    where
        F: FnOnce(&mut EntryBuilder),
    {
        let mut builder = EntryBuilder::new(participant, rank);
        f(&mut builder);
        self.entries.push(builder.build());
        self
    }

    #[inline]
    pub fn build(self) -> Standings {
        Standings {
            entries: self.entries,
            keys: self.keys,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EntryBuilder {
    participant: ParticipantId,
    rank: u32,
    values: Vec<EntryValue>,
}

impl EntryBuilder {
    #[inline]
    const fn new(participant: ParticipantId, rank: u32) -> Self {
        Self {
            participant,
            rank,
            values: Vec::new(),
        }
    }

    #[inline]
    pub fn value<V>(&mut self, value: V) -> &mut Self
    where
        V: Into<EntryValue>,
    {
        self.values.push(value.into());
        self
    }

    #[inline]
    fn build(self) -> Entry {
        Entry {
            participant: self.participant,
            rank: self.rank,
            values: self.values,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: &'a Standings,
    next: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.entries.get(self.next)?;
        self.next += 1;
        Some(entry)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {
    #[inline]
    fn len(&self) -> usize {
        self.inner.entries.len() - self.next
    }
}

impl<'a> FusedIterator for Iter<'a> {}

#[derive(Clone, Debug)]
pub struct Keys<'a> {
    inner: &'a Standings,
    next: usize,
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let key = self.inner.keys.get(self.next)?;
        self.next += 1;
        Some(key)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl<'a> ExactSizeIterator for Keys<'a> {
    #[inline]
    fn len(&self) -> usize {
        self.inner.keys.len() - self.next
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entry {
    pub participant: ParticipantId,
    /// The competition rank of the entry. Tied entries share a rank.
    pub rank: u32,
    pub values: Vec<EntryValue>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum EntryValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(Cow<'static, str>),
}

impl Display for EntryValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(val) => Display::fmt(val, f),
            Self::I64(val) => Display::fmt(val, f),
            Self::U64(val) => Display::fmt(val, f),
            Self::F64(val) => write!(f, "{:.2}", val),
            Self::Str(val) => Display::fmt(val, f),
        }
    }
}

impl From<bool> for EntryValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for EntryValue {
    #[inline]
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u64> for EntryValue {
    #[inline]
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<f64> for EntryValue {
    #[inline]
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<&'static str> for EntryValue {
    #[inline]
    fn from(value: &'static str) -> Self {
        Self::Str(Cow::Borrowed(value))
    }
}

impl From<String> for EntryValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

/// The match tallies of a participant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    pub participant: ParticipantId,
    pub seed: u32,
    pub wins: u64,
    pub losses: u64,
    pub byes: u64,
    pub game_wins: u64,
    pub game_losses: u64,
    pub opponents: Vec<ParticipantId>,
}

impl Record {
    pub fn new(participant: &Participant) -> Self {
        Self {
            participant: participant.id,
            seed: participant.seed,
            ..Default::default()
        }
    }

    #[inline]
    pub fn played(&self) -> u64 {
        self.wins + self.losses
    }

    #[inline]
    pub fn game_difference(&self) -> i64 {
        self.game_wins as i64 - self.game_losses as i64
    }

    pub fn game_win_percentage(&self) -> f64 {
        match self.game_wins + self.game_losses {
            0 => 0.0,
            games => self.game_wins as f64 / games as f64,
        }
    }
}

/// Tallies all completed two player `matches` of the `entrants`. The records are returned in
/// the order of `entrants`.
pub fn tally<'a, I>(entrants: &[&Participant], matches: I) -> Vec<Record>
where
    I: IntoIterator<Item = &'a Match>,
{
    let mut records: Vec<Record> = entrants.iter().map(|p| Record::new(p)).collect();
    let positions: HashMap<ParticipantId, usize> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.participant, index))
        .collect();

    for m in matches {
        if m.state != MatchState::Complete || m.entrants.len() != 2 {
            continue;
        }

        let (Some(winner), Some(loser)) = (m.winner, m.loser) else {
            continue;
        };

        if let Some(&index) = positions.get(&winner) {
            let record = &mut records[index];
            record.wins += 1;
            record.game_wins += u64::from(m.score_of(winner).unwrap_or(0));
            record.game_losses += u64::from(m.score_of(loser).unwrap_or(0));
            record.opponents.push(loser);
        }

        if let Some(&index) = positions.get(&loser) {
            let record = &mut records[index];
            record.losses += 1;
            record.game_wins += u64::from(m.score_of(loser).unwrap_or(0));
            record.game_losses += u64::from(m.score_of(winner).unwrap_or(0));
            record.opponents.push(winner);
        }
    }

    records
}

/// Compares two records by match wins and then the `ranked_by` tie-break. The better record
/// is [`Less`].
///
/// [`Less`]: Ordering::Less
pub fn compare(a: &Record, b: &Record, ranked_by: RankedBy) -> Ordering {
    let by_wins = b.wins.cmp(&a.wins);

    by_wins.then_with(|| match ranked_by {
        RankedBy::MatchWins => a
            .losses
            .cmp(&b.losses)
            .then_with(|| b.game_difference().cmp(&a.game_difference())),
        RankedBy::GameWins => b.game_wins.cmp(&a.game_wins),
        RankedBy::GameWinPercentage => b
            .game_win_percentage()
            .total_cmp(&a.game_win_percentage()),
        RankedBy::PointsDifference => b.game_difference().cmp(&a.game_difference()),
    })
}

/// Compares the direct encounters of `a` and `b`. The participant who won more of them is
/// [`Less`].
///
/// [`Less`]: Ordering::Less
fn head_to_head(a: ParticipantId, b: ParticipantId, matches: &[&Match]) -> Ordering {
    let (mut wins_a, mut wins_b) = (0, 0);
    for m in matches {
        if m.state != MatchState::Complete || !m.contains(a) || !m.contains(b) {
            continue;
        }

        if m.winner == Some(a) {
            wins_a += 1;
        } else if m.winner == Some(b) {
            wins_b += 1;
        }
    }

    wins_b.cmp(&wins_a)
}

/// Sorts the `records` by [`compare`] and assigns competition ranks ("1224").
///
/// A tie between exactly two records is broken by their direct encounters. Remaining ties
/// share a rank and are listed by seed.
pub fn rank_records(
    mut records: Vec<Record>,
    ranked_by: RankedBy,
    matches: &[&Match],
) -> Vec<(Record, u32)> {
    records.sort_by(|a, b| compare(a, b, ranked_by).then(a.seed.cmp(&b.seed)));

    // decided[i]: records i and i + 1 are separated by their direct encounters.
    let mut decided = vec![false; records.len()];
    let mut start = 0;
    while start < records.len() {
        let mut end = start + 1;
        while end < records.len()
            && compare(&records[start], &records[end], ranked_by) == Ordering::Equal
        {
            end += 1;
        }

        if end - start == 2 {
            match head_to_head(records[start].participant, records[start + 1].participant, matches)
            {
                Ordering::Less => decided[start] = true,
                Ordering::Greater => {
                    records.swap(start, start + 1);
                    decided[start] = true;
                }
                Ordering::Equal => (),
            }
        }

        start = end;
    }

    let ranks = competition_ranks(&records, |index, a, b| {
        compare(a, b, ranked_by) == Ordering::Equal && !decided[index - 1]
    });

    records.into_iter().zip(ranks).collect()
}

/// Assigns competition ranks to already sorted `items`. `tied(index, previous, current)`
/// returns whether the item at `index` shares the rank of the item before it.
pub fn competition_ranks<T, F>(items: &[T], mut tied: F) -> Vec<u32>
where
    F: FnMut(usize, &T, &T) -> bool,
{
    let mut ranks: Vec<u32> = Vec::with_capacity(items.len());
    for index in 0..items.len() {
        let rank = if index > 0 && tied(index, &items[index - 1], &items[index]) {
            ranks[index - 1]
        } else {
            index as u32 + 1
        };

        ranks.push(rank);
    }

    ranks
}

/// Depth of the grand final, above every other round.
const GRAND_FINAL_DEPTH: i64 = 1 << 16;

/// How far a participant made it in an elimination bracket. A greater exit is better.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Exit {
    /// Lost a match of the given depth. `placement` splits the participants of placement
    /// matches: 2 for the winner, 1 for the loser, 0 otherwise.
    Eliminated { depth: i64, placement: u8 },
    Champion,
    /// Still playing.
    Alive,
}

/// Determines the [`Exit`] of all `entrants` in the elimination bracket `matches`.
///
/// A participant exits a completed match if no other match consumes their result from it.
pub(crate) fn elimination_exits(
    matches: &[&Match],
    entrants: &[&Participant],
) -> HashMap<ParticipantId, Exit> {
    let consumed: Vec<_> = matches.iter().flat_map(|m| m.prerequisites()).collect();
    let is_consumed = |id, is_loser| {
        consumed
            .iter()
            .any(|p| p.match_id == id && p.is_loser == is_loser)
    };

    let depth = |m: &Match| -> i64 {
        match m.section {
            Section::GrandFinal | Section::GrandFinalReset => GRAND_FINAL_DEPTH,
            _ => i64::from(m.round.abs()),
        }
    };

    let mut exits: HashMap<ParticipantId, Exit> =
        entrants.iter().map(|p| (p.id, Exit::Alive)).collect();

    for &m in matches {
        if m.state != MatchState::Complete {
            continue;
        }

        let (winner_exit, loser_exit) = if m.section == Section::ThirdPlace {
            // Placed at the depth of the deepest match feeding it.
            let feeder = m
                .prerequisites()
                .filter_map(|p| matches.iter().find(|f| f.id == p.match_id))
                .map(|f| depth(*f))
                .max()
                .unwrap_or_else(|| depth(m));

            (
                Exit::Eliminated {
                    depth: feeder,
                    placement: 2,
                },
                Exit::Eliminated {
                    depth: feeder,
                    placement: 1,
                },
            )
        } else {
            (
                Exit::Champion,
                Exit::Eliminated {
                    depth: depth(m),
                    placement: 0,
                },
            )
        };

        if let Some(winner) = m.winner {
            if !is_consumed(m.id, false) {
                exits.insert(winner, winner_exit);
            }
        }

        if let Some(loser) = m.loser {
            if !is_consumed(m.id, true) {
                exits.insert(loser, loser_exit);
            }
        }
    }

    exits
}

/// Ranks the `entrants` by their exits. Equal exits share a rank.
pub(crate) fn exit_ranks(
    exits: &HashMap<ParticipantId, Exit>,
    entrants: &[&Participant],
) -> Vec<(ParticipantId, u32)> {
    let exit_of = |id: ParticipantId| exits.get(&id).copied().unwrap_or(Exit::Alive);

    let mut order: Vec<&Participant> = entrants.to_vec();
    order.sort_by(|a, b| exit_of(b.id).cmp(&exit_of(a.id)).then(a.seed.cmp(&b.seed)));

    let ranks = competition_ranks(&order, |_, a, b| exit_of(a.id) == exit_of(b.id));
    order.into_iter().map(|p| p.id).zip(ranks).collect()
}

/// Builds the standings of an elimination bracket.
pub(crate) fn elimination_standings(matches: &[&Match], entrants: &[&Participant]) -> Standings {
    let exits = elimination_exits(matches, entrants);
    let records = tally(entrants, matches.iter().copied());

    let mut builder = Standings::builder();
    builder.key("Wins").key("Losses").key("Eliminated");

    for (participant, rank) in exit_ranks(&exits, entrants) {
        let record = records
            .iter()
            .find(|r| r.participant == participant)
            .cloned()
            .unwrap_or_default();
        let eliminated = matches!(exits.get(&participant), Some(Exit::Eliminated { .. }));

        builder.entry(participant, rank, |e| {
            e.value(record.wins).value(record.losses).value(eliminated);
        });
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{compare, competition_ranks, rank_records, tally, Record};
    use crate::options::RankedBy;
    use crate::{participants, Match, MatchId, MatchResult, Matches, ParticipantId, Section, Slot};

    fn record(id: u64, wins: u64, game_wins: u64, game_losses: u64) -> Record {
        Record {
            participant: ParticipantId(id),
            seed: id as u32,
            wins,
            game_wins,
            game_losses,
            ..Default::default()
        }
    }

    #[test]
    fn test_competition_ranks() {
        let scores = [5, 3, 3, 1];
        let ranks = competition_ranks(&scores, |_, a, b| a == b);
        assert_eq!(ranks, [1, 2, 2, 4]);
    }

    #[test]
    fn test_compare() {
        let a = record(1, 2, 4, 2);
        let b = record(2, 2, 5, 1);

        assert_eq!(compare(&a, &b, RankedBy::GameWins), Ordering::Greater);
        assert_eq!(compare(&a, &b, RankedBy::PointsDifference), Ordering::Greater);
        assert_eq!(compare(&a, &record(3, 1, 9, 0), RankedBy::GameWins), Ordering::Less);
    }

    #[test]
    fn test_tally_and_head_to_head() {
        let participants = participants!(3);
        let entrants: Vec<_> = participants.iter().collect();

        let mut matches = Matches::from(vec![
            Match::new(
                MatchId(1),
                1,
                Section::Group(1),
                vec![Slot::entrant(ParticipantId(1)), Slot::entrant(ParticipantId(2))],
            ),
            Match::new(
                MatchId(2),
                2,
                Section::Group(1),
                vec![Slot::entrant(ParticipantId(1)), Slot::entrant(ParticipantId(3))],
            ),
            Match::new(
                MatchId(3),
                3,
                Section::Group(1),
                vec![Slot::entrant(ParticipantId(2)), Slot::entrant(ParticipantId(3))],
            ),
        ]);
        matches
            .report_result(MatchId(1), MatchResult::new(ParticipantId(2)).scores(1, 2))
            .unwrap();
        matches
            .report_result(MatchId(2), MatchResult::new(ParticipantId(1)).scores(2, 0))
            .unwrap();
        matches
            .report_result(MatchId(3), MatchResult::new(ParticipantId(3)).scores(0, 2))
            .unwrap();

        let records = tally(&entrants, matches.iter());
        assert_eq!(records[0].wins, 1);
        assert_eq!(records[0].game_wins, 3);
        assert_eq!(records[0].game_losses, 2);
        assert_eq!(records[1].opponents, [ParticipantId(1), ParticipantId(3)]);

        let matches: Vec<_> = matches.iter().collect();
        let ranked = rank_records(records.clone(), RankedBy::PointsDifference, &matches);
        let ranks: Vec<_> = ranked.iter().map(|(r, rank)| (r.participant.0, *rank)).collect();
        assert_eq!(ranks, [(1, 1), (3, 2), (2, 3)]);

        // 2 and 3 are tied on game wins, 3 won their match.
        let ranked = rank_records(records, RankedBy::GameWins, &matches);
        let ranks: Vec<_> = ranked.iter().map(|(r, rank)| (r.participant.0, *rank)).collect();
        assert_eq!(ranks, [(1, 1), (3, 2), (2, 3)]);

        // A three way tie is not broken by direct encounters.
        let records = vec![record(3, 1, 0, 0), record(1, 1, 0, 0), record(2, 1, 0, 0)];
        let ranked = rank_records(records, RankedBy::GameWins, &matches);
        let ranks: Vec<_> = ranked.iter().map(|(r, rank)| (r.participant.0, *rank)).collect();
        assert_eq!(ranks, [(1, 1), (2, 1), (3, 1)]);
    }
}
