use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::options::{RankedBy, TournamentOptionValues, TournamentOptions};
use crate::standings::{compare, competition_ranks, rank_records, tally, Record};
use crate::tournament::TournamentKind;
use crate::utils::snake;
use crate::{
    participant, Error, FinalRanks, Generation, GenerationStats, GroupId, Match, MatchId, Matches,
    Participant, ParticipantId, Result, Section, Slot, Standings, System,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A round robin tournament.
///
/// The participants are split into groups. Within every group each participant plays every
/// other participant exactly once. Groups play their rounds in parallel.
#[derive(Clone, Debug, Default)]
pub struct RoundRobin {
    options: RoundRobinOptions,
}

impl RoundRobin {
    pub fn new(options: RoundRobinOptions) -> Self {
        Self { options }
    }

    /// Creates a new `RoundRobin` system from untyped option values.
    pub fn with_values(values: TournamentOptionValues) -> Result<Self> {
        let options = RoundRobinOptions::try_from(values)?;
        log::debug!("Using options: {:?}", options);

        Ok(Self::new(options))
    }

    /// Returns the [`TournamentOptions`] accepted by this system.
    pub fn options() -> TournamentOptions {
        TournamentOptions::builder()
            .option(
                "group_count",
                "Number of groups (0 to use the groups of the participants)",
                0u64,
            )
            .option("ranked_by", "Tie-break after match wins", "match_wins")
            .build()
    }

    /// Calculates the ranked standings of every group.
    pub fn calculate_standings(
        &self,
        matches: &Matches,
        participants: &[Participant],
    ) -> Result<Vec<GroupStanding>> {
        let entrants = participant::active(participants);
        let groups = assign_groups(&entrants, self.options.group_count)?;

        Ok(group_standings(&groups, matches, self.options.ranked_by))
    }
}

impl System for RoundRobin {
    fn kind(&self) -> TournamentKind {
        TournamentKind::RoundRobin
    }

    fn generate(&self, participants: &[Participant]) -> Result<Generation> {
        let entrants = participant::active(participants);
        let groups = assign_groups(&entrants, self.options.group_count)?;

        log::debug!(
            "Creating new RoundRobin bracket with {} entrants in {} groups",
            entrants.len(),
            groups.len()
        );

        let matches = group_matches(&groups, MatchId(1));
        let rounds = groups
            .values()
            .map(|members| rounds(members.len()))
            .max()
            .unwrap_or(0);

        log::debug!(
            "Created new RoundRobin bracket with {} matches",
            matches.len()
        );

        Ok(Generation {
            stats: GenerationStats {
                rounds: rounds as u32,
                losers_rounds: 0,
                matches: matches.len(),
                byes: 0,
                groups: groups.len(),
            },
            matches,
        })
    }

    fn is_complete(&self, matches: &Matches, _participants: &[Participant]) -> bool {
        !matches.is_empty() && matches.iter().all(Match::is_complete)
    }

    fn final_ranks(&self, matches: &Matches, participants: &[Participant]) -> Result<FinalRanks> {
        if !self.is_complete(matches, participants) {
            return Err(Error::Incomplete);
        }

        Ok(self.standings(matches, participants)?.ranks())
    }

    fn standings(&self, matches: &Matches, participants: &[Participant]) -> Result<Standings> {
        let groups = self.calculate_standings(matches, participants)?;
        Ok(combined_standings(&groups, self.options.ranked_by))
    }
}

/// The standings of a single group.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupStanding {
    pub group: GroupId,
    /// The records of all group members with their rank within the group, best first.
    pub entries: Vec<(Record, u32)>,
}

impl GroupStanding {
    /// Returns the best `count` participants of the group.
    pub fn top(&self, count: usize) -> impl Iterator<Item = (&Record, u32)> + '_ {
        self.entries
            .iter()
            .take(count)
            .map(|(record, rank)| (record, *rank))
    }
}

/// Splits the `entrants` (ordered by seed) into groups.
///
/// With a `group_count` the entrants are distributed in snake order: 1, 2, 3, 3, 2, 1, ...
/// Otherwise the groups of the participants are used. If no participant has a group, all
/// entrants play in a single group.
pub(crate) fn assign_groups<'a>(
    entrants: &[&'a Participant],
    group_count: u32,
) -> Result<BTreeMap<GroupId, Vec<&'a Participant>>> {
    let mut groups: BTreeMap<GroupId, Vec<&'a Participant>> = BTreeMap::new();

    if group_count > 0 {
        for (index, members) in snake(entrants, group_count as usize).into_iter().enumerate() {
            groups.insert(index as GroupId + 1, members);
        }

        // Groups that did not receive a single participant.
        if groups.len() < group_count as usize {
            return Err(Error::InsufficientParticipants {
                required: 2,
                found: 0,
            });
        }
    } else if entrants.iter().all(|p| p.group_id.is_none()) {
        groups.insert(1, entrants.to_vec());
    } else {
        for participant in entrants.iter().copied() {
            let group = participant
                .group_id
                .ok_or(Error::MissingGroup(participant.id))?;
            groups.entry(group).or_default().push(participant);
        }
    }

    let smallest = groups.values().map(Vec::len).min().unwrap_or(0);
    if smallest < 2 {
        return Err(Error::InsufficientParticipants {
            required: 2,
            found: smallest,
        });
    }

    Ok(groups)
}

/// Creates the matches of all `groups`, numbered starting at `first_id`. The rounds of all
/// groups are interleaved.
pub(crate) fn group_matches(
    groups: &BTreeMap<GroupId, Vec<&Participant>>,
    first_id: MatchId,
) -> Matches {
    let schedules: Vec<(GroupId, Vec<Vec<[ParticipantId; 2]>>)> = groups
        .iter()
        .map(|(group, members)| (*group, schedule(members)))
        .collect();

    let rounds = schedules.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
    let total = schedules
        .iter()
        .map(|(_, s)| s.iter().map(Vec::len).sum::<usize>())
        .sum();

    let mut matches = Matches::with_capacity(total);
    let mut next = first_id.0;
    for round in 0..rounds {
        for (group, schedule) in &schedules {
            let Some(pairs) = schedule.get(round) else {
                continue;
            };

            for [first, second] in pairs {
                matches.push(Match::new(
                    MatchId(next),
                    round as i32 + 1,
                    Section::Group(*group),
                    vec![Slot::entrant(*first), Slot::entrant(*second)],
                ));
                next += 1;
            }
        }
    }

    matches.sequence();
    matches
}

/// Returns the number of rounds a group of `members` plays.
#[inline]
fn rounds(members: usize) -> usize {
    match members {
        0 | 1 => 0,
        n => n + n % 2 - 1,
    }
}

/// Pairs the `members` of a group using the circle method. With an odd number of members a
/// different member sits out every round.
fn schedule(members: &[&Participant]) -> Vec<Vec<[ParticipantId; 2]>> {
    // One dummy entrant past the end for odd groups.
    let n = members.len() + members.len() % 2;

    (0..rounds(members.len()))
        .map(|round| {
            (0..n / 2)
                .filter_map(|index| {
                    let first = members.get(circle_entrant(n, round, index))?;
                    let second = members.get(circle_entrant(n, round, n - index - 1))?;
                    Some([first.id, second.id])
                })
                .collect()
        })
        .collect()
}

/// Returns the index of the entrant at the given `index` in a circle of length `n` at the
/// given `round`. Index 0 is pinned while all others rotate.
#[inline]
fn circle_entrant(n: usize, round: usize, index: usize) -> usize {
    debug_assert!(n % 2 == 0);

    if index == 0 {
        return 0;
    }

    match index as isize - round as isize {
        res if res <= 0 => n - res.unsigned_abs() - 1,
        res => res as usize,
    }
}

/// Ranks the members of every group by their group matches.
pub(crate) fn group_standings(
    groups: &BTreeMap<GroupId, Vec<&Participant>>,
    matches: &Matches,
    ranked_by: RankedBy,
) -> Vec<GroupStanding> {
    groups
        .iter()
        .map(|(&group, members)| {
            let played: Vec<&Match> = matches
                .iter()
                .filter(|m| m.section == Section::Group(group))
                .collect();
            let records = tally(members, played.iter().copied());

            GroupStanding {
                group,
                entries: rank_records(records, ranked_by, &played),
            }
        })
        .collect()
}

/// Merges the standings of all `groups`. Participants are ordered by their rank within their
/// group, then by their records. Equal group ranks with equal records share a rank.
pub(crate) fn combined_standings(groups: &[GroupStanding], ranked_by: RankedBy) -> Standings {
    let mut entries: Vec<(GroupId, &Record, u32)> = groups
        .iter()
        .flat_map(|g| {
            g.entries
                .iter()
                .map(move |(record, rank)| (g.group, record, *rank))
        })
        .collect();

    let tied = |a: &(GroupId, &Record, u32), b: &(GroupId, &Record, u32)| {
        a.2 == b.2 && compare(a.1, b.1, ranked_by) == Ordering::Equal
    };

    entries.sort_by(|a, b| {
        a.2.cmp(&b.2)
            .then_with(|| compare(a.1, b.1, ranked_by))
            .then(a.1.seed.cmp(&b.1.seed))
    });
    let ranks = competition_ranks(&entries, |_, a, b| tied(a, b));

    let mut builder = Standings::builder();
    builder
        .key("Group")
        .key("Group Rank")
        .key("Wins")
        .key("Losses")
        .key("Game Difference");

    for ((group, record, group_rank), rank) in entries.into_iter().zip(ranks) {
        builder.entry(record.participant, rank, |e| {
            e.value(u64::from(group))
                .value(u64::from(group_rank))
                .value(record.wins)
                .value(record.losses)
                .value(record.game_difference());
        });
    }

    builder.build()
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoundRobinOptions {
    /// The number of groups. 0 uses the groups assigned to the participants.
    pub group_count: u32,
    pub ranked_by: RankedBy,
}

impl Default for RoundRobinOptions {
    fn default() -> Self {
        Self {
            group_count: 0,
            ranked_by: RankedBy::MatchWins,
        }
    }
}

impl TryFrom<TournamentOptionValues> for RoundRobinOptions {
    type Error = crate::options::Error;

    fn try_from(values: TournamentOptionValues) -> std::result::Result<Self, Self::Error> {
        let mut values = values.merge(RoundRobin::options())?;

        Ok(Self {
            group_count: values.take_u32("group_count")?,
            ranked_by: values.take_parsed("ranked_by")?,
        })
    }
}
