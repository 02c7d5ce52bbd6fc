use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::options::{TournamentOptionValues, TournamentOptions};
use crate::render::Visualization;
use crate::seeding::SeedAssignment;
use crate::state::TournamentState;
use crate::{
    participant, DoubleElimination, Error, FinalRanks, FreeForAll, Generation, GenerationStats,
    Leaderboard, MatchId, MatchResult, MatchStats, Matches, Participant, ParticipantId, Result,
    RoundRobin, SingleElimination, Standings, Swiss, System, TournamentId, TwoStage,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A tournament: a [`Format`], its participants and matches, gated by a [`TournamentState`].
///
/// Every operation checks the current state first and leaves the tournament unchanged if it
/// fails.
#[derive(Clone, Debug)]
pub struct Tournament {
    id: TournamentId,
    format: Format,
    state: TournamentState,
    participants: Vec<Participant>,
    matches: Matches,
}

impl Tournament {
    /// Creates a new pending tournament without participants.
    pub fn new(id: TournamentId, kind: TournamentKind, values: TournamentOptionValues) -> Result<Self> {
        let format = Format::new(kind, values)?;

        Ok(Self {
            id,
            format,
            state: TournamentState::Pending,
            participants: Vec::new(),
            matches: Matches::new(),
        })
    }

    /// Rebuilds a tournament from its persisted parts. The match graph is validated.
    pub fn resume(
        id: TournamentId,
        kind: TournamentKind,
        values: TournamentOptionValues,
        state: TournamentState,
        participants: Vec<Participant>,
        matches: Matches,
    ) -> Result<Self> {
        let format = Format::new(kind, values)?;
        matches.validate()?;

        log::debug!(
            "Resuming {} tournament {} with {} matches",
            kind,
            id,
            matches.len()
        );

        Ok(Self {
            id,
            format,
            state,
            participants,
            matches,
        })
    }

    #[inline]
    pub fn id(&self) -> TournamentId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> TournamentKind {
        self.format.kind()
    }

    #[inline]
    pub fn format(&self) -> &Format {
        &self.format
    }

    #[inline]
    pub fn state(&self) -> TournamentState {
        self.state
    }

    #[inline]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    #[inline]
    pub fn matches(&self) -> &Matches {
        &self.matches
    }

    pub fn into_parts(self) -> (Vec<Participant>, Matches) {
        (self.participants, self.matches)
    }

    pub fn open_check_in(&mut self) -> Result<()> {
        self.state = self.state.open_check_in()?;
        Ok(())
    }

    /// Adds a participant, replacing an existing participant with the same id. A participant
    /// with seed 0 is seeded last. Seeds are renumbered afterwards.
    pub fn add_participant(&mut self, mut participant: Participant) -> Result<()> {
        self.ensure_participants_mutable()?;

        participant.tournament_id = self.id;
        if participant.seed == 0 {
            participant.seed = self.participants.iter().map(|p| p.seed).max().unwrap_or(0) + 1;
        }

        match self.participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }

        participant::resequence(&mut self.participants);
        Ok(())
    }

    pub fn remove_participant(&mut self, id: ParticipantId) -> Result<Participant> {
        self.ensure_participants_mutable()?;

        let index = self
            .participants
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::UnknownParticipant(id))?;

        let participant = self.participants.remove(index);
        participant::resequence(&mut self.participants);
        Ok(participant)
    }

    pub fn check_in(&mut self, id: ParticipantId) -> Result<()> {
        if self.state != TournamentState::CheckingIn {
            return Err(Error::InvalidState {
                action: "check in to",
                state: self.state,
            });
        }

        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.id == id && p.active)
            .ok_or(Error::UnknownParticipant(id))?;

        participant.checked_in = true;
        Ok(())
    }

    /// Applies the seeds of `assignment` to the participants.
    pub fn apply_seeding(&mut self, assignment: &SeedAssignment) -> Result<()> {
        self.ensure_participants_mutable()?;
        assignment.apply(&mut self.participants)
    }

    /// Starts the tournament and generates the initial matches.
    ///
    /// When started from check-in, participants that did not check in are deactivated.
    pub fn start(&mut self) -> Result<GenerationStats> {
        let state = self.state.start()?;

        let mut participants = self.participants.clone();
        if self.state == TournamentState::CheckingIn {
            for participant in participants.iter_mut().filter(|p| !p.checked_in) {
                participant.active = false;
            }

            participant::resequence(&mut participants);
        }

        let active = participants.iter().filter(|p| p.active).count();
        if active < 2 {
            return Err(Error::InsufficientParticipants {
                required: 2,
                found: active,
            });
        }

        let Generation { matches, stats } = self.format.generate(&participants)?;

        log::info!(
            "Started {} tournament {} with {} participants and {} matches",
            self.kind(),
            self.id,
            active,
            matches.len()
        );

        self.participants = participants;
        self.matches = matches;
        self.state = state;
        Ok(stats)
    }

    /// Reports the result of the match `id`. The tournament moves to review once no further
    /// matches need to be played.
    pub fn report_result(&mut self, id: MatchId, result: MatchResult) -> Result<Vec<MatchId>> {
        self.ensure_running("report a result for")?;

        let opened = self.format.report_result(&mut self.matches, id, result)?;
        self.update_completion();
        Ok(opened)
    }

    /// Reopens the completed match `id`. A tournament awaiting review goes back underway.
    pub fn reopen(&mut self, id: MatchId) -> Result<Vec<MatchId>> {
        self.ensure_running("reopen a match of")?;

        let reset = self.format.reopen(&mut self.matches, id)?;
        self.update_completion();
        Ok(reset)
    }

    /// Records the finishing positions of a free-for-all heat or of a reopened leaderboard
    /// event.
    pub fn record_placements(
        &mut self,
        id: MatchId,
        placements: &[(ParticipantId, u32)],
    ) -> Result<Vec<MatchId>> {
        self.ensure_running("record placements for")?;

        let opened = match &self.format {
            Format::Leaderboard(system) => {
                system.record_placements(&mut self.matches, id, placements)?
            }
            format => format
                .as_free_for_all()?
                .record_placements(&mut self.matches, id, placements)?,
        };
        self.update_completion();
        Ok(opened)
    }

    /// Records a new leaderboard event.
    pub fn record_event(&mut self, placements: &[(ParticipantId, u32)]) -> Result<MatchId> {
        self.ensure_running("record an event for")?;

        let id = self.format.as_leaderboard()?.record_event(
            &mut self.matches,
            &self.participants,
            placements,
        )?;
        self.update_completion();
        Ok(id)
    }

    /// Generates the next swiss round. Returns the ids of the new matches.
    pub fn next_swiss_round(&mut self) -> Result<Vec<MatchId>> {
        self.ensure_running("generate a round for")?;

        let new = self
            .format
            .as_swiss()?
            .next_round(&self.matches, &self.participants)?;
        Ok(self.append(new))
    }

    /// Generates the knockout bracket of a two stage tournament.
    pub fn generate_knockout_bracket(&mut self) -> Result<Vec<MatchId>> {
        self.ensure_running("generate a knockout bracket for")?;

        let new = self
            .format
            .as_two_stage()?
            .generate_knockout_bracket(&self.matches, &self.participants)?;
        Ok(self.append(new))
    }

    /// Opens the next round of a free-for-all tournament.
    pub fn open_next_round(&mut self) -> Result<Vec<MatchId>> {
        self.ensure_running("open a round for")?;

        let new = self
            .format
            .as_free_for_all()?
            .open_next_round(&self.matches, &self.participants)?;
        Ok(self.append(new))
    }

    pub fn mark_underway(&mut self, id: MatchId) -> Result<()> {
        self.ensure_running("mark a match underway for")?;
        self.matches.mark_underway(id)
    }

    pub fn unmark_underway(&mut self, id: MatchId) -> Result<()> {
        self.ensure_running("unmark a match underway for")?;
        self.matches.unmark_underway(id)
    }

    /// Assigns the match `id` to a station, or releases it with `None`.
    pub fn assign_station(&mut self, id: MatchId, station: Option<String>) -> Result<()> {
        self.ensure_running("assign a station for")?;
        self.matches.assign_station(id, station)
    }

    #[inline]
    pub fn stats(&self) -> MatchStats {
        self.matches.stats()
    }

    /// Completes the tournament and writes the final rank of every participant.
    pub fn complete(&mut self) -> Result<FinalRanks> {
        let state = self.state.complete()?;
        if !self.format.is_complete(&self.matches, &self.participants) {
            return Err(Error::Incomplete);
        }

        let ranks = self.format.final_ranks(&self.matches, &self.participants)?;
        for participant in self.participants.iter_mut() {
            participant.final_rank = ranks.get(&participant.id).copied();
        }

        log::info!("Completed tournament {}", self.id);

        self.state = state;
        Ok(ranks)
    }

    /// Resets the tournament to pending, removing all matches and final ranks.
    pub fn reset(&mut self) -> Result<()> {
        self.state = self.state.reset()?;

        self.matches.clear();
        for participant in self.participants.iter_mut() {
            participant.final_rank = None;
            participant.checked_in = false;
        }

        log::info!("Reset tournament {}", self.id);
        Ok(())
    }

    pub fn standings(&self) -> Result<Standings> {
        self.format.standings(&self.matches, &self.participants)
    }

    pub fn visualize(&self) -> Visualization {
        self.format.visualize(&self.matches, &self.participants)
    }

    /// Replaces the generation ids of all matches with storage ids.
    pub fn remap_match_ids(&mut self, ids: &HashMap<MatchId, MatchId>) -> Result<()> {
        self.matches.remap_ids(ids)
    }

    fn ensure_participants_mutable(&self) -> Result<()> {
        if self.state.participants_frozen() {
            return Err(Error::ParticipantsFrozen(self.state));
        }

        Ok(())
    }

    fn ensure_running(&self, action: &'static str) -> Result<()> {
        if !self.state.is_running() {
            return Err(Error::InvalidState {
                action,
                state: self.state,
            });
        }

        Ok(())
    }

    /// Moves between `underway` and `awaiting_review` using the guarded transitions of
    /// [`TournamentState`].
    fn update_completion(&mut self) {
        let complete = self.format.is_complete(&self.matches, &self.participants);
        let next = match (self.state, complete) {
            (TournamentState::Underway, true) => self.state.review(),
            (TournamentState::AwaitingReview, false) => self.state.resume(),
            _ => return,
        };

        match next {
            Ok(state) => {
                log::debug!("Tournament {} is now {}", self.id, state);
                self.state = state;
            }
            Err(err) => log::error!("Failed to update tournament {}: {}", self.id, err),
        }
    }

    fn append(&mut self, new: Matches) -> Vec<MatchId> {
        let ids = new.iter().map(|m| m.id).collect();
        self.matches.extend(new);
        ids
    }
}

/// All supported tournament formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TournamentKind {
    SingleElimination,
    DoubleElimination,
    Swiss,
    RoundRobin,
    TwoStage,
    FreeForAll,
    Leaderboard,
}

impl TournamentKind {
    pub const ALL: [Self; 7] = [
        Self::SingleElimination,
        Self::DoubleElimination,
        Self::Swiss,
        Self::RoundRobin,
        Self::TwoStage,
        Self::FreeForAll,
        Self::Leaderboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleElimination => "single_elimination",
            Self::DoubleElimination => "double_elimination",
            Self::Swiss => "swiss",
            Self::RoundRobin => "round_robin",
            Self::TwoStage => "two_stage",
            Self::FreeForAll => "free_for_all",
            Self::Leaderboard => "leaderboard",
        }
    }
}

impl Display for TournamentKind {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown tournament format: {0:?}")]
pub struct ParseKindError(String);

impl FromStr for TournamentKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseKindError(s.to_owned()))
    }
}

/// A configured tournament system of any [`TournamentKind`].
#[derive(Clone, Debug)]
pub enum Format {
    SingleElimination(SingleElimination),
    DoubleElimination(DoubleElimination),
    Swiss(Swiss),
    RoundRobin(RoundRobin),
    TwoStage(TwoStage),
    FreeForAll(FreeForAll),
    Leaderboard(Leaderboard),
}

macro_rules! dispatch {
    ($format:expr, $system:ident => $e:expr) => {
        match $format {
            Format::SingleElimination($system) => $e,
            Format::DoubleElimination($system) => $e,
            Format::Swiss($system) => $e,
            Format::RoundRobin($system) => $e,
            Format::TwoStage($system) => $e,
            Format::FreeForAll($system) => $e,
            Format::Leaderboard($system) => $e,
        }
    };
}

impl Format {
    /// Creates the system for `kind` from untyped option values.
    pub fn new(kind: TournamentKind, values: TournamentOptionValues) -> Result<Self> {
        Ok(match kind {
            TournamentKind::SingleElimination => {
                Self::SingleElimination(SingleElimination::with_values(values)?)
            }
            TournamentKind::DoubleElimination => {
                Self::DoubleElimination(DoubleElimination::with_values(values)?)
            }
            TournamentKind::Swiss => Self::Swiss(Swiss::with_values(values)?),
            TournamentKind::RoundRobin => Self::RoundRobin(RoundRobin::with_values(values)?),
            TournamentKind::TwoStage => Self::TwoStage(TwoStage::with_values(values)?),
            TournamentKind::FreeForAll => Self::FreeForAll(FreeForAll::with_values(values)?),
            TournamentKind::Leaderboard => Self::Leaderboard(Leaderboard::with_values(values)?),
        })
    }

    /// Returns the [`TournamentOptions`] accepted by `kind`.
    pub fn options(kind: TournamentKind) -> TournamentOptions {
        match kind {
            TournamentKind::SingleElimination => SingleElimination::options(),
            TournamentKind::DoubleElimination => DoubleElimination::options(),
            TournamentKind::Swiss => Swiss::options(),
            TournamentKind::RoundRobin => RoundRobin::options(),
            TournamentKind::TwoStage => TwoStage::options(),
            TournamentKind::FreeForAll => FreeForAll::options(),
            TournamentKind::Leaderboard => Leaderboard::options(),
        }
    }

    pub fn as_swiss(&self) -> Result<&Swiss> {
        match self {
            Self::Swiss(system) => Ok(system),
            _ => Err(self.mismatch(TournamentKind::Swiss)),
        }
    }

    pub fn as_round_robin(&self) -> Result<&RoundRobin> {
        match self {
            Self::RoundRobin(system) => Ok(system),
            _ => Err(self.mismatch(TournamentKind::RoundRobin)),
        }
    }

    pub fn as_two_stage(&self) -> Result<&TwoStage> {
        match self {
            Self::TwoStage(system) => Ok(system),
            _ => Err(self.mismatch(TournamentKind::TwoStage)),
        }
    }

    pub fn as_free_for_all(&self) -> Result<&FreeForAll> {
        match self {
            Self::FreeForAll(system) => Ok(system),
            _ => Err(self.mismatch(TournamentKind::FreeForAll)),
        }
    }

    pub fn as_leaderboard(&self) -> Result<&Leaderboard> {
        match self {
            Self::Leaderboard(system) => Ok(system),
            _ => Err(self.mismatch(TournamentKind::Leaderboard)),
        }
    }

    fn mismatch(&self, expected: TournamentKind) -> Error {
        Error::FormatMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl System for Format {
    fn kind(&self) -> TournamentKind {
        dispatch!(self, system => system.kind())
    }

    fn generate(&self, participants: &[Participant]) -> Result<Generation> {
        dispatch!(self, system => system.generate(participants))
    }

    fn is_complete(&self, matches: &Matches, participants: &[Participant]) -> bool {
        dispatch!(self, system => system.is_complete(matches, participants))
    }

    fn final_ranks(&self, matches: &Matches, participants: &[Participant]) -> Result<FinalRanks> {
        dispatch!(self, system => system.final_ranks(matches, participants))
    }

    fn standings(&self, matches: &Matches, participants: &[Participant]) -> Result<Standings> {
        dispatch!(self, system => system.standings(matches, participants))
    }

    fn report_result(
        &self,
        matches: &mut Matches,
        id: MatchId,
        result: MatchResult,
    ) -> Result<Vec<MatchId>> {
        dispatch!(self, system => system.report_result(matches, id, result))
    }

    fn reopen(&self, matches: &mut Matches, id: MatchId) -> Result<Vec<MatchId>> {
        dispatch!(self, system => system.reopen(matches, id))
    }

    fn visualize(&self, matches: &Matches, participants: &[Participant]) -> Visualization {
        dispatch!(self, system => system.visualize(matches, participants))
    }
}
