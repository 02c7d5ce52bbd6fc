//! # bracket-core
//!
//! This crate contains the bracket engine used to run live tournaments. It turns a seeded list
//! of participants into a match graph for a given format, advances that graph as results arrive
//! and computes standings and final rankings.
//!
//! Important types:
//! - [`System`]: The contract every tournament format implements.
//! - [`Format`]: The closed set of builtin formats, dispatching to the concrete systems.
//! - [`Tournament`]: The lifecycle aggregate gating which operations are legal.
//! - [`Matches`]: A flat arena of [`Match`]es referencing each other by [`MatchId`].
//! - [`Slot`]: A spot within a match. It either holds a resolved participant, waits on a
//! [`Prerequisite`] match or stays permanently empty.
//! - [`Standings`]: Ranked entries with format specific statistics.
//!
//! All functions are pure computations over caller supplied snapshots: nothing in this crate
//! performs I/O or holds global state. Randomness only exists in [`seeding`] and is driven by a
//! caller provided random source.
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to almost all types and enables parsing
//! option blobs from JSON. Enabled by default.
//!
pub mod active;
pub mod options;
pub mod participant;
pub mod render;
pub mod seeding;
pub mod standings;
pub mod state;
pub mod tournament;

mod builder;
mod double_elimination;
mod free_for_all;
mod graph;
mod leaderboard;
mod round_robin;
mod single_elimination;
mod swiss;
mod two_stage;
mod utils;

pub use double_elimination::{DoubleElimination, DoubleEliminationOptions};
pub use free_for_all::{FreeForAll, FreeForAllOptions};
pub use graph::MatchStats;
pub use leaderboard::{Leaderboard, LeaderboardOptions};
pub use participant::Participant;
pub use round_robin::{GroupStanding, RoundRobin, RoundRobinOptions};
pub use single_elimination::{seed_positions, SingleElimination, SingleEliminationOptions};
pub use standings::Standings;
pub use state::TournamentState;
pub use swiss::{Swiss, SwissOptions};
pub use tournament::{Format, Tournament, TournamentKind};
pub use two_stage::{TwoStage, TwoStageOptions};

use render::Visualization;

use thiserror::Error;

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub u64);

        impl Display for $name {
            #[inline]
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

id_type! {
    /// The unique id of a participant.
    ParticipantId
}

id_type! {
    /// The id of a match. Ids handed out during generation are temporary and get remapped to
    /// storage ids using [`Matches::remap_ids`].
    MatchId
}

id_type! {
    /// The id of a tournament.
    TournamentId
}

id_type! {
    /// The id of a tenant owning tournaments.
    TenantId
}

/// The id of a group in grouped formats. Groups are numbered starting at 1.
pub type GroupId = u32;

/// The final rank of every participant, keyed by participant. Rank 1 is the first place.
pub type FinalRanks = BTreeMap<ParticipantId, u32>;

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("at least {required} active participants are required, found {found}")]
    InsufficientParticipants { required: usize, found: usize },
    #[error("cannot {action} a tournament that is {state}")]
    InvalidState {
        action: &'static str,
        state: TournamentState,
    },
    #[error("participants cannot be changed while the tournament is {0}")]
    ParticipantsFrozen(TournamentState),
    #[error("round {round} is not complete")]
    RoundIncomplete { round: u32 },
    #[error("all {rounds} rounds have already been generated")]
    RoundLimitReached { rounds: u32 },
    #[error("the final round has already been generated")]
    NoFurtherRounds,
    #[error("match {id} belongs to round {round}, which later rounds were paired from")]
    RoundClosed { id: MatchId, round: u32 },
    #[error("the group stage is not complete")]
    GroupStageIncomplete,
    #[error("the knockout bracket has already been generated")]
    KnockoutExists,
    #[error("operation requires a {expected} tournament, found {found}")]
    FormatMismatch {
        expected: TournamentKind,
        found: TournamentKind,
    },
    #[error("invalid placements: {0}")]
    InvalidPlacements(String),
    #[error("invalid result: {0}")]
    InvalidResult(String),
    #[error("unknown match {0}")]
    UnknownMatch(MatchId),
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),
    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(ParticipantId),
    #[error("participant {0} has no group")]
    MissingGroup(ParticipantId),
    #[error("match {id} is {state}")]
    MatchNotOpen { id: MatchId, state: MatchState },
    #[error("match {id} is {state}")]
    MatchNotComplete { id: MatchId, state: MatchState },
    #[error("match {0} is already complete")]
    MatchComplete(MatchId),
    #[error("participant {participant} is not playing in match {id}")]
    NotInMatch {
        id: MatchId,
        participant: ParticipantId,
    },
    #[error("the tournament is not complete")]
    Incomplete,
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] options::Error),
    #[error("invalid bracket: {0}")]
    InvalidBracket(String),
}

/// The class of an [`enum@Error`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input is malformed.
    Validation,
    /// The input is valid but conflicts with the current state.
    Conflict,
    /// An internal invariant was violated. This is a bug in the engine.
    Internal,
}

impl Error {
    /// Returns the machine readable code of the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientParticipants { .. } => "insufficient_participants",
            Self::InvalidState { .. } => "invalid_state",
            Self::ParticipantsFrozen(_) => "participants_frozen",
            Self::RoundIncomplete { .. } => "round_incomplete",
            Self::RoundLimitReached { .. } => "round_limit_reached",
            Self::NoFurtherRounds => "no_further_rounds",
            Self::RoundClosed { .. } => "round_closed",
            Self::GroupStageIncomplete => "group_stage_incomplete",
            Self::KnockoutExists => "knockout_exists",
            Self::FormatMismatch { .. } => "format_mismatch",
            Self::InvalidPlacements(_) => "invalid_placements",
            Self::InvalidResult(_) => "invalid_result",
            Self::UnknownMatch(_) => "unknown_match",
            Self::UnknownParticipant(_) => "unknown_participant",
            Self::DuplicateParticipant(_) => "duplicate_participant",
            Self::MissingGroup(_) => "missing_group",
            Self::MatchNotOpen { .. } => "match_not_open",
            Self::MatchNotComplete { .. } => "match_not_complete",
            Self::MatchComplete(_) => "match_complete",
            Self::NotInMatch { .. } => "not_in_match",
            Self::Incomplete => "tournament_incomplete",
            Self::InvalidOptions(_) => "invalid_options",
            Self::InvalidBracket(_) => "invalid_bracket",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientParticipants { .. }
            | Self::FormatMismatch { .. }
            | Self::InvalidPlacements(_)
            | Self::InvalidResult(_)
            | Self::UnknownMatch(_)
            | Self::UnknownParticipant(_)
            | Self::DuplicateParticipant(_)
            | Self::MissingGroup(_)
            | Self::NotInMatch { .. }
            | Self::InvalidOptions(_) => ErrorKind::Validation,
            Self::InvalidBracket(_) => ErrorKind::Internal,
            _ => ErrorKind::Conflict,
        }
    }

    /// Returns `true` if the error indicates a bug in the engine rather than caller misuse.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

/// The state of a single [`Match`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchState {
    /// At least one player is not resolved yet.
    Pending,
    /// All players are known and the match can be played.
    Open,
    /// A result has been recorded.
    Complete,
}

impl Display for MatchState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Open => "open",
            Self::Complete => "complete",
        })
    }
}

/// The part of a tournament a [`Match`] belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Section {
    /// The main bracket (winners bracket), swiss rounds and free-for-all heats.
    Main,
    /// The losers bracket of a double elimination bracket.
    Losers,
    ThirdPlace,
    GrandFinal,
    /// The deciding match after the losers bracket champion won the grand final.
    GrandFinalReset,
    Group(GroupId),
    /// A scored event of a leaderboard.
    Event,
}

impl Section {
    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

/// A reference to the match whose winner (or loser) fills a [`Slot`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Prerequisite {
    pub match_id: MatchId,
    pub is_loser: bool,
}

/// A spot for a participant within a [`Match`].
///
/// A slot with a `source` is filled once the prerequisite match completes. A slot without an
/// entrant and without a source is permanently empty.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Slot {
    pub entrant: Option<ParticipantId>,
    pub source: Option<Prerequisite>,
}

impl Slot {
    /// Creates a new `Slot` holding the resolved `participant`.
    #[inline]
    pub const fn entrant(participant: ParticipantId) -> Self {
        Self {
            entrant: Some(participant),
            source: None,
        }
    }

    /// Creates a new `Slot` that is filled by the winner of `match_id`.
    #[inline]
    pub const fn winner_of(match_id: MatchId) -> Self {
        Self {
            entrant: None,
            source: Some(Prerequisite {
                match_id,
                is_loser: false,
            }),
        }
    }

    /// Creates a new `Slot` that is filled by the loser of `match_id`.
    #[inline]
    pub const fn loser_of(match_id: MatchId) -> Self {
        Self {
            entrant: None,
            source: Some(Prerequisite {
                match_id,
                is_loser: true,
            }),
        }
    }

    /// Returns `true` if the slot holds a participant.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.entrant.is_some()
    }

    /// Returns `true` if the slot is permanently empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entrant.is_none() && self.source.is_none()
    }
}

/// The finishing position of a participant in a free-for-all match or leaderboard event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    pub participant: ParticipantId,
    pub position: u32,
    pub points: i64,
}

/// A match of two (or, in free-for-all formats, more) participants.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match {
    pub id: MatchId,
    /// The round of the match. Losers bracket rounds are negative.
    pub round: i32,
    /// The human readable label of the match (`A`, `B`, ..., `AA`).
    pub identifier: String,
    pub section: Section,
    pub entrants: Vec<Slot>,
    pub state: MatchState,
    pub winner: Option<ParticipantId>,
    pub loser: Option<ParticipantId>,
    /// The scores of the first two slots.
    pub scores: Option<[u32; 2]>,
    pub forfeit: bool,
    pub placements: Vec<Placement>,
    /// The suggested order in which matches should be played, starting at 1.
    pub play_order: u32,
    /// A reference to the external station the match is played on.
    pub station: Option<String>,
    pub underway: bool,
}

impl Match {
    /// Creates a new `Match` with the given `entrants`. The match is [`Open`] if all slots are
    /// resolved and [`Pending`] otherwise.
    ///
    /// [`Open`]: MatchState::Open
    /// [`Pending`]: MatchState::Pending
    pub fn new(id: MatchId, round: i32, section: Section, entrants: Vec<Slot>) -> Self {
        let mut this = Self {
            id,
            round,
            identifier: String::new(),
            section,
            entrants,
            state: MatchState::Pending,
            winner: None,
            loser: None,
            scores: None,
            forfeit: false,
            placements: Vec::new(),
            play_order: 0,
            station: None,
            underway: false,
        };

        if this.is_ready() {
            this.state = MatchState::Open;
        }

        this
    }

    /// Returns the first slot of the match.
    #[inline]
    pub fn player1(&self) -> Option<&Slot> {
        self.entrants.first()
    }

    /// Returns the second slot of the match.
    #[inline]
    pub fn player2(&self) -> Option<&Slot> {
        self.entrants.get(1)
    }

    /// Returns `true` if at least two slots exist and every slot holds a participant.
    pub fn is_ready(&self) -> bool {
        self.entrants.len() >= 2 && self.entrants.iter().all(Slot::is_resolved)
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state == MatchState::Complete
    }

    /// Returns an iterator over all resolved participants in the match.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.entrants.iter().filter_map(|slot| slot.entrant)
    }

    /// Returns `true` if `participant` is playing in this match.
    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.participants().any(|id| id == participant)
    }

    /// Returns the position of the slot holding `participant`.
    pub fn slot_of(&self, participant: ParticipantId) -> Option<usize> {
        self.entrants
            .iter()
            .position(|slot| slot.entrant == Some(participant))
    }

    /// Returns the opponent of `participant` in a two player match.
    pub fn opponent_of(&self, participant: ParticipantId) -> Option<ParticipantId> {
        if self.entrants.len() != 2 {
            return None;
        }

        match self.slot_of(participant)? {
            0 => self.entrants[1].entrant,
            _ => self.entrants[0].entrant,
        }
    }

    /// Returns the recorded score of `participant`.
    pub fn score_of(&self, participant: ParticipantId) -> Option<u32> {
        let scores = self.scores?;
        scores.get(self.slot_of(participant)?).copied()
    }

    /// Returns an iterator over the prerequisite edges of this match.
    pub fn prerequisites(&self) -> impl Iterator<Item = Prerequisite> + '_ {
        self.entrants.iter().filter_map(|slot| slot.source)
    }

    /// Returns `true` if this match is a grouped round robin match.
    #[inline]
    pub fn is_group(&self) -> bool {
        self.section.is_group()
    }
}

impl Index<usize> for Match {
    type Output = Slot;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.entrants[index]
    }
}

impl IndexMut<usize> for Match {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.entrants[index]
    }
}

/// A wrapper around a `Vec<Match>` forming the match graph of a tournament.
///
/// Matches reference their prerequisites by [`MatchId`], never by position, so the order of
/// the matches carries no meaning.
#[derive(Clone, Debug, Default, PartialEq)]
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Matches {
    matches: Vec<Match>,
}

impl Matches {
    #[inline]
    pub fn new() -> Self {
        Self {
            matches: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            matches: Vec::with_capacity(capacity),
        }
    }

    /// Returns the position of the match with the given `id`.
    #[inline]
    pub fn position(&self, id: MatchId) -> Option<usize> {
        self.matches.iter().position(|m| m.id == id)
    }

    /// Returns a reference to the match with the given `id`.
    #[inline]
    pub fn get_by_id(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    /// Returns a mutable reference to the match with the given `id`.
    #[inline]
    pub fn get_by_id_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.iter_mut().find(|m| m.id == id)
    }

    /// Returns the id following the highest id in use, starting at 1.
    pub fn next_id(&self) -> MatchId {
        MatchId(self.matches.iter().map(|m| m.id.0).max().unwrap_or(0) + 1)
    }

    /// Returns the highest round of the matches in the given `section`.
    pub fn last_round(&self, section: Section) -> Option<i32> {
        self.matches
            .iter()
            .filter(|m| m.section == section)
            .map(|m| m.round)
            .max()
    }

    /// Returns an iterator over all matches in the given `round` of the `section`.
    pub fn round(&self, section: Section, round: i32) -> impl Iterator<Item = &Match> + '_ {
        self.matches
            .iter()
            .filter(move |m| m.section == section && m.round == round)
    }

    /// Returns the inner `Vec<Match>`.
    #[inline]
    pub fn into_inner(self) -> Vec<Match> {
        self.matches
    }
}

impl Deref for Matches {
    type Target = Vec<Match>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.matches
    }
}

impl DerefMut for Matches {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.matches
    }
}

impl From<Vec<Match>> for Matches {
    #[inline]
    fn from(matches: Vec<Match>) -> Self {
        Self { matches }
    }
}

impl FromIterator<Match> for Matches {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Match>,
    {
        Self {
            matches: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Matches {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

/// The result of a head-to-head [`Match`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchResult {
    pub(crate) winner: ParticipantId,
    pub(crate) scores: Option<[u32; 2]>,
    pub(crate) forfeit: bool,
}

impl MatchResult {
    /// Creates a new `MatchResult` won by `winner`.
    #[inline]
    pub fn new(winner: ParticipantId) -> Self {
        Self {
            winner,
            scores: None,
            forfeit: false,
        }
    }

    /// Sets the scores of the first and second slot.
    #[inline]
    pub fn scores(mut self, player1: u32, player2: u32) -> Self {
        self.scores = Some([player1, player2]);
        self
    }

    /// Marks the result as a forfeit of the loser.
    #[inline]
    pub fn forfeit(mut self) -> Self {
        self.forfeit = true;
        self
    }

    #[inline]
    pub fn winner(&self) -> ParticipantId {
        self.winner
    }
}

/// Statistics about a freshly generated set of matches.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenerationStats {
    /// The number of rounds in the main bracket (or round robin/swiss rounds).
    pub rounds: u32,
    pub losers_rounds: u32,
    pub matches: usize,
    /// The number of byes handed out.
    pub byes: usize,
    pub groups: usize,
}

/// The output of [`System::generate`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Generation {
    pub matches: Matches,
    pub stats: GenerationStats,
}

/// A tournament system.
///
/// Every function takes the current snapshot of participants and matches and must be
/// deterministic: the same inputs always produce the same outputs.
pub trait System {
    /// Returns the [`TournamentKind`] of this system.
    fn kind(&self) -> TournamentKind;

    /// Generates the initial matches for the active `participants`, ordered by seed.
    fn generate(&self, participants: &[Participant]) -> Result<Generation>;

    /// Returns `true` if no further matches need to be played.
    fn is_complete(&self, matches: &Matches, participants: &[Participant]) -> bool;

    /// Calculates the final rank of every participant of a completed tournament.
    fn final_ranks(&self, matches: &Matches, participants: &[Participant]) -> Result<FinalRanks>;

    /// Calculates the current standings.
    fn standings(&self, matches: &Matches, participants: &[Participant]) -> Result<Standings>;

    /// Records the `result` of the match `id` and advances the winner and loser. Returns the
    /// ids of all matches that were opened or created by the result.
    fn report_result(
        &self,
        matches: &mut Matches,
        id: MatchId,
        result: MatchResult,
    ) -> Result<Vec<MatchId>> {
        matches.report_result(id, result)
    }

    /// Reopens the completed match `id`, resetting all matches that depend on it. Returns the
    /// ids of all reset matches.
    fn reopen(&self, matches: &mut Matches, id: MatchId) -> Result<Vec<MatchId>> {
        matches.reopen(id)
    }

    /// Returns a display ready tree of the matches.
    fn visualize(&self, matches: &Matches, participants: &[Participant]) -> Visualization {
        Visualization::new(self.kind(), matches, participants, false)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        participant, MatchId, MatchState, Matches, Participant, ParticipantId, System,
        TournamentId,
    };

    use super::MatchResult;

    #[macro_export]
    macro_rules! participants {
        ($n:expr) => {
            (1..=$n)
                .map(|i: u64| {
                    $crate::Participant::new(
                        $crate::ParticipantId(i),
                        $crate::TournamentId(1),
                        format!("Player {}", i),
                        i as u32,
                    )
                })
                .collect::<Vec<_>>()
        };
    }

    #[macro_export]
    macro_rules! option_values {
        ($($key:expr => $val:expr),*$(,)?) => {{
            #[allow(unused_mut)]
            let mut options = $crate::options::TournamentOptionValues::new();
            $(
                options.set($key, $val);
            )*

            options
        }};
    }

    /// Plays every open match until none is left, letting the better seed win.
    pub fn play_favorites<S>(system: &S, matches: &mut Matches, participants: &[Participant])
    where
        S: System,
    {
        play_with(system, matches, participants, |a, b| a.seed < b.seed);
    }

    /// Plays every open match until none is left. `first_wins` decides whether the first
    /// participant beats the second one.
    pub fn play_with<S, F>(
        system: &S,
        matches: &mut Matches,
        participants: &[Participant],
        mut first_wins: F,
    ) where
        S: System,
        F: FnMut(&Participant, &Participant) -> bool,
    {
        while let Some((id, a, b)) = next_open(matches) {
            let a = participant::find(participants, a).unwrap();
            let b = participant::find(participants, b).unwrap();

            let winner = if first_wins(a, b) { a.id } else { b.id };
            system
                .report_result(matches, id, MatchResult::new(winner))
                .unwrap();
        }
    }

    pub fn next_open(matches: &Matches) -> Option<(MatchId, ParticipantId, ParticipantId)> {
        let m = matches
            .iter()
            .filter(|m| m.state == MatchState::Open && m.entrants.len() == 2)
            .min_by_key(|m| m.play_order)?;

        Some((m.id, m.entrants[0].entrant?, m.entrants[1].entrant?))
    }

    #[test]
    fn test_participants_macro() {
        let participants = participants!(3);

        assert_eq!(participants.len(), 3);
        assert_eq!(participants[2].id, ParticipantId(3));
        assert_eq!(participants[2].seed, 3);
        assert_eq!(participants[0].tournament_id, TournamentId(1));
    }
}
