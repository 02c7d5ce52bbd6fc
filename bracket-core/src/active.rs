//! Selection of the active tournament of a tenant.
//!
//! Displays like a venue screen show a single tournament per tenant. An operator can pin a
//! tournament explicitly, otherwise the most relevant tournament is picked automatically.
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::state::TournamentState;
use crate::{TenantId, TournamentId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The fields of a tournament relevant for selecting the active tournament.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TournamentSummary {
    pub id: TournamentId,
    pub tenant_id: TenantId,
    pub state: TournamentState,
    pub starts_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Tracks pinned tournaments and picks the active tournament of every tenant.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActiveTournamentSelector {
    pins: HashMap<TenantId, TournamentId>,
}

impl ActiveTournamentSelector {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `tournament` as the active tournament of `tenant`, replacing a previous pin.
    pub fn pin(&mut self, tenant: TenantId, tournament: TournamentId) {
        log::debug!("Pinning tournament {} for tenant {}", tournament, tenant);
        self.pins.insert(tenant, tournament);
    }

    /// Removes the pin of `tenant`, returning the previously pinned tournament.
    pub fn unpin(&mut self, tenant: TenantId) -> Option<TournamentId> {
        self.pins.remove(&tenant)
    }

    #[inline]
    pub fn pinned(&self, tenant: TenantId) -> Option<TournamentId> {
        self.pins.get(&tenant).copied()
    }

    /// Returns the active tournament of `tenant` among `tournaments`.
    ///
    /// A pinned tournament wins as long as it exists and is not complete, otherwise the pin is
    /// cleared and the tournament is picked by [`auto_select`].
    pub fn select(
        &mut self,
        tenant: TenantId,
        tournaments: &[TournamentSummary],
    ) -> Option<TournamentId> {
        if let Some(id) = self.pinned(tenant) {
            let pinned = tournaments
                .iter()
                .find(|t| t.id == id && t.tenant_id == tenant);

            match pinned {
                Some(t) if t.state != TournamentState::Complete => return Some(id),
                _ => {
                    log::debug!("Clearing stale pin {} of tenant {}", id, tenant);
                    self.pins.remove(&tenant);
                }
            }
        }

        auto_select(tenant, tournaments)
    }
}

/// Picks the active tournament of `tenant` without considering pins.
///
/// The newest underway tournament is preferred. Otherwise the pending (or checking in)
/// tournament starting next is picked; tournaments without a start time come last and ties go
/// to the newest tournament. Tournaments awaiting review or complete are never picked.
pub fn auto_select(tenant: TenantId, tournaments: &[TournamentSummary]) -> Option<TournamentId> {
    let candidates = || tournaments.iter().filter(move |t| t.tenant_id == tenant);

    let underway = candidates()
        .filter(|t| t.state == TournamentState::Underway)
        .max_by_key(|t| (t.created_at, t.id));
    if let Some(t) = underway {
        return Some(t.id);
    }

    candidates()
        .filter(|t| matches!(t.state, TournamentState::Pending | TournamentState::CheckingIn))
        .min_by(|a, b| {
            // `None` sorts before `Some`, so missing start times are flipped to the end.
            (a.starts_at.is_none(), a.starts_at)
                .cmp(&(b.starts_at.is_none(), b.starts_at))
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        })
        .map(|t| t.id)
}
