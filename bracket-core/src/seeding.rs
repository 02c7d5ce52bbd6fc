//! Seeding strategies.
//!
//! Every strategy is a pure function from the current participants (and an external ranking
//! source) to a [`SeedAssignment`]. Nothing is changed until the assignment is [`apply`]ed.
//!
//! [`apply`]: SeedAssignment::apply
use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::options;
use crate::{participant, Error, FinalRanks, Participant, ParticipantId, Result, Standings};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The rating of participants without a rating.
pub const BASELINE_RATING: f64 = 1200.0;

/// A new order of the active participants. The first participant receives seed 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SeedAssignment {
    order: Vec<ParticipantId>,
}

impl SeedAssignment {
    #[inline]
    pub fn new(order: Vec<ParticipantId>) -> Self {
        Self { order }
    }

    /// Returns the participants ordered by their new seed.
    #[inline]
    pub fn order(&self) -> &[ParticipantId] {
        &self.order
    }

    /// Returns the new seed of `participant`.
    pub fn seed_of(&self, participant: ParticipantId) -> Option<u32> {
        self.order
            .iter()
            .position(|id| *id == participant)
            .map(|index| index as u32 + 1)
    }

    /// Returns an iterator over all participants and their new seeds.
    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, u32)> + '_ {
        self.order
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index as u32 + 1))
    }

    /// Writes the new seeds to the `participants`. The assignment must contain every active
    /// participant exactly once. Inactive participants are left unchanged.
    pub fn apply(&self, participants: &mut [Participant]) -> Result<()> {
        let active = participants.iter().filter(|p| p.active).count();
        if active != self.order.len() {
            let missing = participants
                .iter()
                .find(|p| p.active && !self.order.contains(&p.id))
                .map(|p| p.id);

            return Err(match missing {
                Some(id) => Error::UnknownParticipant(id),
                None => Error::InsufficientParticipants {
                    required: self.order.len(),
                    found: active,
                },
            });
        }

        let mut seen = HashSet::with_capacity(self.order.len());
        for id in &self.order {
            if !seen.insert(*id) {
                return Err(Error::DuplicateParticipant(*id));
            }

            if !participants.iter().any(|p| p.active && p.id == *id) {
                return Err(Error::UnknownParticipant(*id));
            }
        }

        for participant in participants.iter_mut().filter(|p| p.active) {
            if let Some(seed) = self.seed_of(participant.id) {
                participant.seed = seed;
            }
        }

        log::debug!("Applied seeds to {} participants", self.order.len());
        Ok(())
    }
}

/// Shuffles the active participants using `rng`.
pub fn random<R>(participants: &[Participant], rng: &mut R) -> SeedAssignment
where
    R: Rng + ?Sized,
{
    let mut order: Vec<ParticipantId> = participant::active(participants)
        .iter()
        .map(|p| p.id)
        .collect();
    order.shuffle(rng);

    SeedAssignment::new(order)
}

/// The rating of a participant.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rating {
    pub rating: f64,
    pub matches_played: u32,
}

/// Orders the active participants by rating, highest first. Ties are broken by the number of
/// matches played, most first. Participants without a rating have the [`BASELINE_RATING`].
pub fn elo(participants: &[Participant], ratings: &HashMap<ParticipantId, Rating>) -> SeedAssignment {
    let rating_of = |id: ParticipantId| {
        ratings.get(&id).copied().unwrap_or(Rating {
            rating: BASELINE_RATING,
            matches_played: 0,
        })
    };

    let mut entrants = participant::active(participants);
    entrants.sort_by(|a, b| {
        let (x, y) = (rating_of(a.id), rating_of(b.id));
        y.rating
            .total_cmp(&x.rating)
            .then(y.matches_played.cmp(&x.matches_played))
            .then(a.seed.cmp(&b.seed))
    });

    SeedAssignment::new(entrants.iter().map(|p| p.id).collect())
}

/// Drafts the active participants in seed order into `team_count` virtual teams, picking in
/// snake order. The `i`-th pick of team `k` receives seed `i * team_count + k + 1`.
pub fn snake_draft(participants: &[Participant], team_count: usize) -> Result<SeedAssignment> {
    if team_count == 0 {
        return Err(Error::InvalidOptions(options::Error::out_of_range(
            "team_count",
            team_count,
            "at least 1",
        )));
    }

    let ids: Vec<ParticipantId> = participant::active(participants)
        .iter()
        .map(|p| p.id)
        .collect();
    let teams = crate::utils::snake(&ids, team_count);

    let picks = teams.iter().map(Vec::len).max().unwrap_or(0);
    let order = (0..picks)
        .flat_map(|pick| teams.iter().filter_map(move |team| team.get(pick).copied()))
        .collect();

    Ok(SeedAssignment::new(order))
}

/// Orders the active participants by their final rank in the `previous` tournament.
///
/// Participants are matched by id first, then by their normalized name. Participants without
/// a previous rank follow in their current seed order.
pub fn previous_tournament(participants: &[Participant], previous: &[Participant]) -> SeedAssignment {
    let ranks: FinalRanks = previous
        .iter()
        .filter_map(|p| Some((p.id, p.final_rank?)))
        .collect();

    by_previous_ranks(participants, previous, &ranks)
}

/// Orders the active participants by their rank in the `standings` of a previous swiss
/// tournament with the `previous` participants. Matching works like [`previous_tournament`].
pub fn swiss_preround(
    participants: &[Participant],
    previous: &[Participant],
    standings: &Standings,
) -> SeedAssignment {
    by_previous_ranks(participants, previous, &standings.ranks())
}

fn by_previous_ranks(
    participants: &[Participant],
    previous: &[Participant],
    ranks: &FinalRanks,
) -> SeedAssignment {
    let by_name: HashMap<String, u32> = previous
        .iter()
        .filter_map(|p| Some((normalize(&p.name), *ranks.get(&p.id)?)))
        .collect();

    let entrants = participant::active(participants);
    let (mut matched, unmatched): (Vec<_>, Vec<_>) = entrants
        .into_iter()
        .map(|p| {
            let rank = ranks
                .get(&p.id)
                .copied()
                .or_else(|| by_name.get(&normalize(&p.name)).copied());
            (p, rank)
        })
        .partition(|(_, rank)| rank.is_some());

    matched.sort_by_key(|(p, rank)| (*rank, p.seed));

    log::debug!(
        "Matched {} participants to previous ranks, {} are new",
        matched.len(),
        unmatched.len()
    );

    SeedAssignment::new(
        matched
            .into_iter()
            .chain(unmatched)
            .map(|(p, _)| p.id)
            .collect(),
    )
}

/// Normalizes a participant name for matching: lowercase and only alphanumeric characters.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
