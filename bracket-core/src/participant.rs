//! Participants of a tournament.
use crate::{GroupId, ParticipantId, TournamentId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A participant (a player or a team) of a tournament.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub name: String,
    /// The seed of the participant. A lower seed is stronger, starting at 1.
    pub seed: u32,
    pub group_id: Option<GroupId>,
    /// Inactive participants are ignored by all tournament systems.
    pub active: bool,
    pub checked_in: bool,
    pub final_rank: Option<u32>,
}

impl Participant {
    pub fn new<T>(id: ParticipantId, tournament_id: TournamentId, name: T, seed: u32) -> Self
    where
        T: ToString,
    {
        Self {
            id,
            tournament_id,
            name: name.to_string(),
            seed,
            group_id: None,
            active: true,
            checked_in: false,
            final_rank: None,
        }
    }

    /// Assigns the participant to the group `group_id`.
    #[inline]
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

/// Returns all active participants ordered by seed. Equal seeds are ordered by id.
pub fn active(participants: &[Participant]) -> Vec<&Participant> {
    let mut active: Vec<&Participant> = participants.iter().filter(|p| p.active).collect();
    active.sort_by_key(|p| (p.seed, p.id));
    active
}

/// Renumbers the seeds of all active participants to be contiguous, starting at 1, while
/// keeping their relative order. Returns `true` if any seed was changed.
pub fn resequence(participants: &mut [Participant]) -> bool {
    let mut order: Vec<usize> = (0..participants.len())
        .filter(|&index| participants[index].active)
        .collect();
    order.sort_by_key(|&index| (participants[index].seed, participants[index].id));

    let mut changed = false;
    for (seed, index) in order.into_iter().enumerate() {
        let seed = seed as u32 + 1;
        if participants[index].seed != seed {
            participants[index].seed = seed;
            changed = true;
        }
    }

    changed
}

/// Returns the participant with the given `id`.
#[inline]
pub fn find(participants: &[Participant], id: ParticipantId) -> Option<&Participant> {
    participants.iter().find(|p| p.id == id)
}
