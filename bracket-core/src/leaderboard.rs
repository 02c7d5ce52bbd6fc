use std::collections::HashMap;

use crate::options::{PointsTable, TournamentOptionValues, TournamentOptions};
use crate::standings::competition_ranks;
use crate::tournament::TournamentKind;
use crate::{
    participant, Error, FinalRanks, Generation, GenerationStats, Match, MatchId, MatchResult,
    Matches, Participant, ParticipantId, Result, Section, Slot, Standings, System,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A points leaderboard.
///
/// There is no bracket. The tournament consists of independent events, each resolved by the
/// finishing positions of its participants. The standings add up the points of all events.
///
/// # Decay
///
/// With decay enabled the points of an event are multiplied by `(1 - decay_rate)^age`, where
/// `age` is the number of events recorded after it.
#[derive(Clone, Debug, Default)]
pub struct Leaderboard {
    options: LeaderboardOptions,
}

impl Leaderboard {
    pub fn new(options: LeaderboardOptions) -> Self {
        Self { options }
    }

    /// Creates a new `Leaderboard` system from untyped option values.
    pub fn with_values(values: TournamentOptionValues) -> Result<Self> {
        let options = LeaderboardOptions::try_from(values)?;
        log::debug!("Using options: {:?}", options);

        Ok(Self::new(options))
    }

    /// Returns the [`TournamentOptions`] accepted by this system.
    pub fn options() -> TournamentOptions {
        TournamentOptions::builder()
            .option(
                "points",
                "Points awarded per finishing position",
                &PointsTable::default(),
            )
            .option("decay_enabled", "Reduce the points of older events", false)
            .option("decay_rate", "Decay per newer event (0 to 1)", 0.0)
            .option(
                "min_events_to_rank",
                "Events required to be ranked",
                0u64,
            )
            .option("events", "Number of events (0 for open ended)", 0u64)
            .build()
    }

    /// Returns the number of events with recorded placements. Reopened events are not counted.
    pub fn event_count(matches: &Matches) -> u32 {
        matches
            .iter()
            .filter(|m| m.section == Section::Event && m.is_complete())
            .count() as u32
    }

    /// Returns the number of the last event, or 0 if no event was recorded.
    fn last_event(matches: &Matches) -> u32 {
        matches.last_round(Section::Event).unwrap_or(0).max(0) as u32
    }

    /// Records a new event with the finishing `placements` of its participants. Returns the id
    /// of the created event.
    pub fn record_event(
        &self,
        matches: &mut Matches,
        participants: &[Participant],
        placements: &[(ParticipantId, u32)],
    ) -> Result<MatchId> {
        // Reopened events keep their slot and are recorded again with `record_placements`.
        let count = Self::last_event(matches);
        if self.options.events > 0 && count >= self.options.events {
            return Err(Error::RoundLimitReached {
                rounds: self.options.events,
            });
        }

        if placements.len() < 2 {
            return Err(Error::InvalidPlacements(format!(
                "an event requires at least 2 placements, found {}",
                placements.len()
            )));
        }

        for (id, _) in placements {
            if !participant::find(participants, *id).map_or(false, |p| p.active) {
                return Err(Error::UnknownParticipant(*id));
            }
        }

        let id = matches.next_id();
        let entrants = placements.iter().map(|(p, _)| Slot::entrant(*p)).collect();
        matches.push(Match::new(id, count as i32 + 1, Section::Event, entrants));

        if let Err(err) = matches.record_placements(id, placements, &self.options.points) {
            matches.retain(|m| m.id != id);
            return Err(err);
        }

        matches.sequence();
        log::debug!("Recorded event {} with {} placements", count + 1, placements.len());

        Ok(id)
    }

    /// Records the finishing `placements` of the reopened event `id` again.
    pub fn record_placements(
        &self,
        matches: &mut Matches,
        id: MatchId,
        placements: &[(ParticipantId, u32)],
    ) -> Result<Vec<MatchId>> {
        let event = matches.get_by_id(id).ok_or(Error::UnknownMatch(id))?;
        if event.section != Section::Event {
            return Err(Error::UnknownMatch(id));
        }

        matches.record_placements(id, placements, &self.options.points)
    }

    /// Returns the weight of an event that is followed by `age` newer events.
    fn weight(&self, age: u32) -> f64 {
        if self.options.decay_enabled {
            (1.0 - self.options.decay_rate).powi(age as i32)
        } else {
            1.0
        }
    }

    pub fn calculate_standings(&self, matches: &Matches, participants: &[Participant]) -> Standings {
        #[derive(Default)]
        struct Totals {
            points: f64,
            events: u32,
            wins: u32,
            podiums: u32,
            best: Option<u32>,
            positions: u32,
        }

        impl Totals {
            fn average(&self) -> f64 {
                match self.events {
                    0 => f64::INFINITY,
                    events => f64::from(self.positions) / f64::from(events),
                }
            }
        }

        let entrants = participant::active(participants);
        let mut totals: HashMap<ParticipantId, Totals> = entrants
            .iter()
            .map(|p| (p.id, Totals::default()))
            .collect();

        let count = Self::last_event(matches);
        for event in matches.iter().filter(|m| m.section == Section::Event) {
            let age = count.saturating_sub(event.round.max(1) as u32);
            let weight = self.weight(age);

            for placement in &event.placements {
                let Some(totals) = totals.get_mut(&placement.participant) else {
                    continue;
                };

                totals.points += placement.points as f64 * weight;
                totals.events += 1;
                totals.positions += placement.position;
                if placement.position == 1 {
                    totals.wins += 1;
                }
                if placement.position <= 3 {
                    totals.podiums += 1;
                }
                totals.best = Some(totals.best.map_or(placement.position, |best| {
                    best.min(placement.position)
                }));
            }
        }

        let min_events = self.options.min_events_to_rank;
        let compare = |a: &Participant, b: &Participant| {
            let (x, y) = (&totals[&a.id], &totals[&b.id]);

            (y.events >= min_events)
                .cmp(&(x.events >= min_events))
                .then_with(|| y.points.total_cmp(&x.points))
                .then_with(|| y.wins.cmp(&x.wins))
                .then_with(|| y.podiums.cmp(&x.podiums))
                .then_with(|| {
                    x.best
                        .unwrap_or(u32::MAX)
                        .cmp(&y.best.unwrap_or(u32::MAX))
                })
                .then_with(|| x.average().total_cmp(&y.average()))
        };

        let mut order = entrants;
        order.sort_by(|&a, &b| compare(a, b).then(a.seed.cmp(&b.seed)));
        let ranks = competition_ranks(&order, |_, &a, &b| compare(a, b).is_eq());

        let mut builder = Standings::builder();
        builder
            .key("Points")
            .key("Events")
            .key("Wins")
            .key("Podiums")
            .key("Best")
            .key("Average")
            .key("Qualified");

        for (p, rank) in order.into_iter().zip(ranks) {
            let totals = &totals[&p.id];
            builder.entry(p.id, rank, |e| {
                if self.options.decay_enabled {
                    e.value(totals.points);
                } else {
                    e.value(totals.points as i64);
                }

                e.value(u64::from(totals.events))
                    .value(u64::from(totals.wins))
                    .value(u64::from(totals.podiums))
                    .value(u64::from(totals.best.unwrap_or(0)))
                    .value(if totals.events == 0 {
                        0.0
                    } else {
                        totals.average()
                    })
                    .value(totals.events >= min_events);
            });
        }

        builder.build()
    }
}

impl System for Leaderboard {
    fn kind(&self) -> TournamentKind {
        TournamentKind::Leaderboard
    }

    /// A leaderboard has no matches until the first event is recorded.
    fn generate(&self, participants: &[Participant]) -> Result<Generation> {
        let entrants = participant::active(participants);
        if entrants.len() < 2 {
            return Err(Error::InsufficientParticipants {
                required: 2,
                found: entrants.len(),
            });
        }

        log::debug!(
            "Creating new Leaderboard with {} entrants",
            entrants.len()
        );

        Ok(Generation {
            matches: Matches::new(),
            stats: GenerationStats {
                rounds: self.options.events,
                ..Default::default()
            },
        })
    }

    /// A leaderboard with a fixed number of events is complete after the last event. An open
    /// ended leaderboard can be completed after the first event. A reopened event must be
    /// recorded again first.
    fn is_complete(&self, matches: &Matches, _participants: &[Participant]) -> bool {
        let reopened = matches
            .iter()
            .any(|m| m.section == Section::Event && !m.is_complete());
        if reopened {
            return false;
        }

        let count = Self::event_count(matches);
        match self.options.events {
            0 => count > 0,
            events => count >= events,
        }
    }

    fn final_ranks(&self, matches: &Matches, participants: &[Participant]) -> Result<FinalRanks> {
        if !self.is_complete(matches, participants) {
            return Err(Error::Incomplete);
        }

        Ok(self.calculate_standings(matches, participants).ranks())
    }

    fn standings(&self, matches: &Matches, participants: &[Participant]) -> Result<Standings> {
        Ok(self.calculate_standings(matches, participants))
    }

    fn report_result(
        &self,
        _matches: &mut Matches,
        id: MatchId,
        _result: MatchResult,
    ) -> Result<Vec<MatchId>> {
        Err(Error::InvalidResult(format!(
            "event {} is resolved by placements, not by a winner",
            id
        )))
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeaderboardOptions {
    pub points: PointsTable,
    pub decay_enabled: bool,
    /// The share of points lost per newer event, in `[0, 1)`.
    pub decay_rate: f64,
    pub min_events_to_rank: u32,
    /// The number of events. 0 is open ended.
    pub events: u32,
}

impl Default for LeaderboardOptions {
    fn default() -> Self {
        Self {
            points: PointsTable::default(),
            decay_enabled: false,
            decay_rate: 0.0,
            min_events_to_rank: 0,
            events: 0,
        }
    }
}

impl TryFrom<TournamentOptionValues> for LeaderboardOptions {
    type Error = crate::options::Error;

    fn try_from(values: TournamentOptionValues) -> std::result::Result<Self, Self::Error> {
        let mut values = values.merge(Leaderboard::options())?;

        let decay_rate = values.take_f64("decay_rate")?;
        if !(0.0..1.0).contains(&decay_rate) {
            return Err(crate::options::Error::out_of_range(
                "decay_rate",
                decay_rate,
                "a value in [0, 1)",
            ));
        }

        Ok(Self {
            points: values.take_points_table("points")?,
            decay_enabled: values.take_bool("decay_enabled")?,
            decay_rate,
            min_events_to_rank: values.take_u32("min_events_to_rank")?,
            events: values.take_u32("events")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Leaderboard;
    use crate::standings::EntryValue;
    use crate::{option_values, participants, Error, MatchState, ParticipantId, System};

    fn placements(order: &[u64]) -> Vec<(ParticipantId, u32)> {
        order
            .iter()
            .enumerate()
            .map(|(index, id)| (ParticipantId(*id), index as u32 + 1))
            .collect()
    }

    #[test]
    fn test_leaderboard_events() {
        let participants = participants!(4);
        let system = Leaderboard::with_values(option_values!("events" => 2u64)).unwrap();
        let mut matches = system.generate(&participants).unwrap().matches;
        assert!(matches.is_empty());
        assert!(!system.is_complete(&matches, &participants));

        let id = system
            .record_event(&mut matches, &participants, &placements(&[1, 2, 3, 4]))
            .unwrap();
        assert_eq!(matches.get_by_id(id).unwrap().state, MatchState::Complete);
        system
            .record_event(&mut matches, &participants, &placements(&[2, 1, 3, 4]))
            .unwrap();

        assert!(system.is_complete(&matches, &participants));
        assert_eq!(
            system.record_event(&mut matches, &participants, &placements(&[1, 2])),
            Err(Error::RoundLimitReached { rounds: 2 })
        );

        // 1 and 2 are tied on every statistic.
        let standings = system.standings(&matches, &participants).unwrap();
        assert_eq!(
            standings.value(ParticipantId(1), "Points"),
            Some(&EntryValue::I64(16))
        );
        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [1, 1, 3, 4]);
    }

    #[test]
    fn test_leaderboard_rerecord_reopened_event() {
        let participants = participants!(3);
        let system = Leaderboard::with_values(option_values!("events" => 1u64)).unwrap();
        let mut matches = system.generate(&participants).unwrap().matches;

        let id = system
            .record_event(&mut matches, &participants, &placements(&[1, 2, 3]))
            .unwrap();
        assert!(system.is_complete(&matches, &participants));

        assert_eq!(system.reopen(&mut matches, id).unwrap(), [id]);
        assert_eq!(Leaderboard::event_count(&matches), 0);
        assert!(!system.is_complete(&matches, &participants));
        assert_eq!(
            system.final_ranks(&matches, &participants),
            Err(Error::Incomplete)
        );

        // The reopened event still occupies the only slot.
        assert_eq!(
            system.record_event(&mut matches, &participants, &placements(&[3, 2, 1])),
            Err(Error::RoundLimitReached { rounds: 1 })
        );

        system
            .record_placements(&mut matches, id, &placements(&[3, 2, 1]))
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].winner, Some(ParticipantId(3)));
        assert!(system.is_complete(&matches, &participants));

        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [3, 2, 1]);
    }

    #[test]
    fn test_leaderboard_decay() {
        let participants = participants!(4);
        let system = Leaderboard::with_values(option_values!(
            "decay_enabled" => true,
            "decay_rate" => 0.5,
        ))
        .unwrap();

        let mut matches = system.generate(&participants).unwrap().matches;
        system
            .record_event(&mut matches, &participants, &placements(&[1, 2, 3, 4]))
            .unwrap();
        system
            .record_event(&mut matches, &participants, &placements(&[2, 1, 3, 4]))
            .unwrap();

        // The first event only counts half.
        let standings = system.standings(&matches, &participants).unwrap();
        assert_eq!(
            standings.value(ParticipantId(1), "Points"),
            Some(&EntryValue::F64(11.0))
        );
        assert_eq!(
            standings.value(ParticipantId(2), "Points"),
            Some(&EntryValue::F64(13.0))
        );

        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [2, 1, 3, 4]);
    }

    #[test]
    fn test_leaderboard_min_events() {
        let participants = participants!(5);
        let system =
            Leaderboard::with_values(option_values!("min_events_to_rank" => 2u64)).unwrap();

        let mut matches = system.generate(&participants).unwrap().matches;
        system
            .record_event(&mut matches, &participants, &placements(&[1, 2, 3, 4]))
            .unwrap();
        system
            .record_event(&mut matches, &participants, &placements(&[5, 1, 2, 3, 4]))
            .unwrap();

        // 5 has the third most points, but only played once.
        let ranks = system.final_ranks(&matches, &participants).unwrap();
        let ranks: Vec<_> = ranks.values().copied().collect();
        assert_eq!(ranks, [1, 2, 3, 4, 5]);

        let standings = system.standings(&matches, &participants).unwrap();
        assert_eq!(
            standings.value(ParticipantId(5), "Qualified"),
            Some(&EntryValue::Bool(false))
        );
    }

    #[test]
    fn test_leaderboard_invalid_events() {
        let participants = participants!(3);
        let system = Leaderboard::default();
        let mut matches = system.generate(&participants).unwrap().matches;

        assert_eq!(
            system.record_event(&mut matches, &participants, &placements(&[1, 9])),
            Err(Error::UnknownParticipant(ParticipantId(9)))
        );
        assert!(matches!(
            system.record_event(&mut matches, &participants, &placements(&[1, 1])),
            Err(Error::InvalidPlacements(_))
        ));
        assert!(matches!(
            system.record_event(&mut matches, &participants, &[(ParticipantId(1), 1)]),
            Err(Error::InvalidPlacements(_))
        ));
        assert!(matches.is_empty());

        assert!(matches!(
            Leaderboard::with_values(option_values!("decay_rate" => 1.0)),
            Err(Error::InvalidOptions(_))
        ));
    }
}
