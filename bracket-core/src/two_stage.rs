use std::collections::HashMap;

use crate::builder::BracketBuilder;
use crate::double_elimination::{self, grand_final_reset, is_bracket_complete, remove_stale_reset};
use crate::options::{
    GrandFinalsModifier, KnockoutFormat, RankedBy, TournamentOptionValues, TournamentOptions,
};
use crate::round_robin::{
    assign_groups, combined_standings, group_matches, group_standings, GroupStanding,
};
use crate::single_elimination::{third_place_match, winners_bracket};
use crate::standings::{competition_ranks, compare, elimination_exits, exit_ranks, tally};
use crate::tournament::TournamentKind;
use crate::{
    participant, Error, FinalRanks, Generation, GenerationStats, GroupId, Match, MatchId,
    MatchResult, Matches, Participant, ParticipantId, Result, Section, Standings, System,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A two stage tournament: A round robin group stage followed by an elimination bracket of
/// the best participants of every group.
///
/// Only the group stage is created by [`generate`]. The knockout bracket is created with
/// [`generate_knockout_bracket`] once all group matches are complete.
///
/// [`generate`]: System::generate
/// [`generate_knockout_bracket`]: Self::generate_knockout_bracket
#[derive(Clone, Debug, Default)]
pub struct TwoStage {
    options: TwoStageOptions,
}

impl TwoStage {
    pub fn new(options: TwoStageOptions) -> Self {
        Self { options }
    }

    /// Creates a new `TwoStage` system from untyped option values.
    pub fn with_values(values: TournamentOptionValues) -> Result<Self> {
        let options = TwoStageOptions::try_from(values)?;
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
            .option(
                "advance_per_group",
                "Participants advancing from every group",
                2u64,
            )
            .option("ranked_by", "Tie-break after match wins", "match_wins")
            .option(
                "knockout_format",
                "Format of the knockout stage",
                "single_elimination",
            )
            .option(
                "grand_finals_modifier",
                "Grand finals of a double elimination knockout stage",
                "double",
            )
            .option(
                "hold_third_place_match",
                "Include a match for the third place",
                false,
            )
            .build()
    }

    /// Returns `true` if all group matches are complete.
    pub fn is_group_stage_complete(matches: &Matches) -> bool {
        let mut groups = matches.iter().filter(|m| m.is_group()).peekable();
        groups.peek().is_some() && groups.all(Match::is_complete)
    }

    /// Returns `true` if the knockout bracket was generated.
    #[inline]
    pub fn has_knockout(matches: &Matches) -> bool {
        matches.iter().any(|m| !m.is_group())
    }

    /// Calculates the standings of every group.
    pub fn calculate_standings(
        &self,
        matches: &Matches,
        participants: &[Participant],
    ) -> Result<Vec<GroupStanding>> {
        let entrants = participant::active(participants);
        let groups = assign_groups(&entrants, self.options.group_count)?;

        Ok(group_standings(&groups, matches, self.options.ranked_by))
    }

    /// Returns the participants advancing to the knockout bracket, ordered by their knockout
    /// seed.
    ///
    /// The best `advance_per_group` of every group advance. All group winners are seeded
    /// first, then all runners-up and so on. Within every tier the groups are ordered by the
    /// records of their winners, so that participants of the same group meet as late as
    /// possible.
    pub fn advancing_participants(
        &self,
        matches: &Matches,
        participants: &[Participant],
    ) -> Result<Vec<ParticipantId>> {
        if !Self::is_group_stage_complete(matches) {
            return Err(Error::GroupStageIncomplete);
        }

        let groups = self.calculate_standings(matches, participants)?;
        Ok(self.advancing(&groups))
    }

    fn advancing(&self, groups: &[GroupStanding]) -> Vec<ParticipantId> {
        let ranked_by = self.options.ranked_by;

        let mut order: Vec<&GroupStanding> = groups.iter().collect();
        order.sort_by(|a, b| match (a.entries.first(), b.entries.first()) {
            (Some((a_top, _)), Some((b_top, _))) => compare(a_top, b_top, ranked_by)
                .then(a_top.seed.cmp(&b_top.seed))
                .then(a.group.cmp(&b.group)),
            _ => a.group.cmp(&b.group),
        });

        (0..self.options.advance_per_group as usize)
            .flat_map(|tier| {
                order
                    .iter()
                    .filter_map(move |group| group.entries.get(tier))
                    .map(|(record, _)| record.participant)
            })
            .collect()
    }

    /// Creates the knockout bracket from the group standings. Match ids continue after the
    /// highest id of `matches`. Returns the new matches, which must be appended to `matches`.
    pub fn generate_knockout_bracket(
        &self,
        matches: &Matches,
        participants: &[Participant],
    ) -> Result<Matches> {
        if Self::has_knockout(matches) {
            return Err(Error::KnockoutExists);
        }

        let seeds = self.advancing_participants(matches, participants)?;
        if seeds.len() < 2 {
            return Err(Error::InsufficientParticipants {
                required: 2,
                found: seeds.len(),
            });
        }

        log::debug!(
            "Creating {} knockout bracket with {} entrants",
            self.options.knockout_format,
            seeds.len()
        );

        let mut builder = BracketBuilder::new();
        match self.options.knockout_format {
            KnockoutFormat::SingleElimination => {
                let rounds = winners_bracket(&mut builder, &seeds, Section::Main);
                if self.options.third_place_match {
                    third_place_match(&mut builder, &rounds);
                }
            }
            KnockoutFormat::DoubleElimination => {
                double_elimination::build(&mut builder, &seeds, self.options.third_place_match);
            }
        }
        builder.collapse_byes();

        let mut knockout = builder.build(matches.next_id())?;
        let last_played = matches.iter().map(|m| m.play_order).max().unwrap_or(0);
        knockout.sequence_from(last_played);

        log::debug!(
            "Created knockout bracket with {} matches",
            knockout.len()
        );

        Ok(knockout)
    }

    fn modifier(&self) -> GrandFinalsModifier {
        match self.options.knockout_format {
            KnockoutFormat::SingleElimination => GrandFinalsModifier::Single,
            KnockoutFormat::DoubleElimination => self.options.grand_finals_modifier,
        }
    }
}

impl System for TwoStage {
    fn kind(&self) -> TournamentKind {
        TournamentKind::TwoStage
    }

    fn generate(&self, participants: &[Participant]) -> Result<Generation> {
        let entrants = participant::active(participants);
        let groups = assign_groups(&entrants, self.options.group_count)?;

        log::debug!(
            "Creating new TwoStage group stage with {} entrants in {} groups",
            entrants.len(),
            groups.len()
        );

        let matches = group_matches(&groups, MatchId(1));
        let rounds = matches.iter().map(|m| m.round).max().unwrap_or(0);

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
        if !Self::is_group_stage_complete(matches) || !Self::has_knockout(matches) {
            return false;
        }

        let mut knockout = matches.iter().filter(|m| !m.is_group());
        match self.options.knockout_format {
            KnockoutFormat::SingleElimination => knockout.all(Match::is_complete),
            KnockoutFormat::DoubleElimination => is_bracket_complete(knockout, self.modifier()),
        }
    }

    fn final_ranks(&self, matches: &Matches, participants: &[Participant]) -> Result<FinalRanks> {
        if !self.is_complete(matches, participants) {
            return Err(Error::Incomplete);
        }

        Ok(self.standings(matches, participants)?.ranks())
    }

    /// Participants of the knockout bracket are ranked by how far they made it in the
    /// bracket. All other participants follow by their group standings.
    fn standings(&self, matches: &Matches, participants: &[Participant]) -> Result<Standings> {
        let groups = self.calculate_standings(matches, participants)?;
        let group_stage = combined_standings(&groups, self.options.ranked_by);

        if !Self::has_knockout(matches) {
            return Ok(group_stage);
        }

        let advancing = self.advancing(&groups);
        let knockout_entrants: Vec<&Participant> = advancing
            .iter()
            .filter_map(|id| participant::find(participants, *id))
            .collect();
        let knockout: Vec<&Match> = matches.iter().filter(|m| !m.is_group()).collect();
        let exits = elimination_exits(&knockout, &knockout_entrants);

        let entrants = participant::active(participants);
        let records = tally(&entrants, matches.iter());
        let group_of: HashMap<ParticipantId, (GroupId, u32)> = groups
            .iter()
            .flat_map(|g| {
                g.entries
                    .iter()
                    .map(move |(record, rank)| (record.participant, (g.group, *rank)))
            })
            .collect();

        let mut ranked: Vec<(ParticipantId, u32, &'static str)> =
            exit_ranks(&exits, &knockout_entrants)
                .into_iter()
                .map(|(id, rank)| (id, rank, "Knockout"))
                .collect();

        // Everyone else keeps their order from the group stage.
        let eliminated: Vec<(ParticipantId, u32)> = group_stage
            .iter()
            .filter(|entry| !advancing.contains(&entry.participant))
            .map(|entry| (entry.participant, entry.rank))
            .collect();
        let offset = ranked.len() as u32;
        let ranks = competition_ranks(&eliminated, |_, a, b| a.1 == b.1);
        ranked.extend(
            eliminated
                .iter()
                .zip(ranks)
                .map(|((id, _), rank)| (*id, offset + rank, "Groups")),
        );

        let mut builder = Standings::builder();
        builder
            .key("Stage")
            .key("Group")
            .key("Group Rank")
            .key("Wins")
            .key("Losses");

        for (id, rank, stage) in ranked {
            let (group, group_rank) = group_of.get(&id).copied().unwrap_or_default();
            let record = records.iter().find(|r| r.participant == id);
            let (wins, losses) = record.map(|r| (r.wins, r.losses)).unwrap_or_default();

            builder.entry(id, rank, |e| {
                e.value(stage)
                    .value(u64::from(group))
                    .value(u64::from(group_rank))
                    .value(wins)
                    .value(losses);
            });
        }

        Ok(builder.build())
    }

    fn report_result(
        &self,
        matches: &mut Matches,
        id: MatchId,
        result: MatchResult,
    ) -> Result<Vec<MatchId>> {
        let mut opened = matches.report_result(id, result)?;

        if let Some(reset) = grand_final_reset(matches, id, self.modifier()) {
            opened.push(reset);
        }

        Ok(opened)
    }

    /// Group matches cannot be reopened once the knockout bracket was seeded from them.
    fn reopen(&self, matches: &mut Matches, id: MatchId) -> Result<Vec<MatchId>> {
        let is_group = matches
            .get_by_id(id)
            .ok_or(Error::UnknownMatch(id))?
            .is_group();
        if is_group && Self::has_knockout(matches) {
            return Err(Error::KnockoutExists);
        }

        let reset = matches.reopen(id)?;
        remove_stale_reset(matches);
        Ok(reset)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwoStageOptions {
    pub group_count: u32,
    pub advance_per_group: u32,
    pub ranked_by: RankedBy,
    pub knockout_format: KnockoutFormat,
    pub grand_finals_modifier: GrandFinalsModifier,
    pub third_place_match: bool,
}

impl Default for TwoStageOptions {
    fn default() -> Self {
        Self {
            group_count: 0,
            advance_per_group: 2,
            ranked_by: RankedBy::MatchWins,
            knockout_format: KnockoutFormat::SingleElimination,
            grand_finals_modifier: GrandFinalsModifier::Double,
            third_place_match: false,
        }
    }
}

impl TryFrom<TournamentOptionValues> for TwoStageOptions {
    type Error = crate::options::Error;

    fn try_from(values: TournamentOptionValues) -> std::result::Result<Self, Self::Error> {
        let mut values = values.merge(TwoStage::options())?;

        let advance_per_group = values.take_u32("advance_per_group")?;
        if advance_per_group == 0 {
            return Err(crate::options::Error::out_of_range(
                "advance_per_group",
                advance_per_group,
                "at least 1",
            ));
        }

        Ok(Self {
            group_count: values.take_u32("group_count")?,
            advance_per_group,
            ranked_by: values.take_parsed("ranked_by")?,
            knockout_format: values.take_parsed("knockout_format")?,
            grand_finals_modifier: values.take_parsed("grand_finals_modifier")?,
            third_place_match: values.take_bool("hold_third_place_match")?,
        })
    }
}
