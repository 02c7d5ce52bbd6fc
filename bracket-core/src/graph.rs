//! Operations on the match graph shared by all formats.
use std::collections::{HashMap, HashSet, VecDeque};

use crate::options::PointsTable;
use crate::utils::identifier;
use crate::{
    Error, MatchId, MatchResult, MatchState, Matches, ParticipantId, Placement, Result,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counts of matches by state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchStats {
    pub total: usize,
    pub pending: usize,
    pub open: usize,
    /// Open matches currently being played.
    pub underway: usize,
    pub complete: usize,
}

impl Matches {
    /// Checks the structural invariants of the match graph: unique ids, resolvable
    /// prerequisites, at most two prerequisite edges per match and no cycles.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::with_capacity(self.len());
        for m in self.iter() {
            if !ids.insert(m.id) {
                return Err(invalid_bracket(format!("duplicate match id {}", m.id)));
            }
        }

        let mut indegree: HashMap<MatchId, usize> = HashMap::with_capacity(self.len());
        let mut dependents: HashMap<MatchId, Vec<MatchId>> = HashMap::new();
        for m in self.iter() {
            let mut edges = 0;
            for prerequisite in m.prerequisites() {
                if !ids.contains(&prerequisite.match_id) {
                    return Err(invalid_bracket(format!(
                        "match {} depends on unknown match {}",
                        m.id, prerequisite.match_id
                    )));
                }

                dependents
                    .entry(prerequisite.match_id)
                    .or_default()
                    .push(m.id);
                edges += 1;
            }

            if edges > 2 {
                return Err(invalid_bracket(format!(
                    "match {} has {} prerequisites",
                    m.id, edges
                )));
            }

            indegree.insert(m.id, edges);
        }

        // Kahn's algorithm: every match must be reachable once its prerequisites are.
        let mut queue: VecDeque<MatchId> = self
            .iter()
            .filter(|m| indegree[&m.id] == 0)
            .map(|m| m.id)
            .collect();
        let mut visited = 0;
        while let Some(id) = queue.pop_front() {
            visited += 1;
            for dependent in dependents.get(&id).into_iter().flatten() {
                if let Some(degree) = indegree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        if visited != self.len() {
            return Err(invalid_bracket(String::from(
                "the prerequisites form a cycle",
            )));
        }

        Ok(())
    }

    /// Records the result of the two player match `id` and advances its winner and loser into
    /// the dependent slots. Returns the ids of all matches opened by the result.
    pub fn report_result(&mut self, id: MatchId, result: MatchResult) -> Result<Vec<MatchId>> {
        let index = self.position(id).ok_or(Error::UnknownMatch(id))?;

        let m = &mut self[index];
        if m.state != MatchState::Open {
            return Err(Error::MatchNotOpen { id, state: m.state });
        }

        if m.entrants.len() != 2 {
            return Err(Error::InvalidResult(format!(
                "match {} has {} participants, use placements instead",
                id,
                m.entrants.len()
            )));
        }

        let loser = m.opponent_of(result.winner).ok_or(Error::NotInMatch {
            id,
            participant: result.winner,
        })?;

        m.winner = Some(result.winner);
        m.loser = Some(loser);
        m.scores = result.scores;
        m.forfeit = result.forfeit;
        m.state = MatchState::Complete;
        m.underway = false;
        m.station = None;

        log::debug!(
            "Match {} won by {} against {} (forfeit: {})",
            id,
            result.winner,
            loser,
            result.forfeit
        );

        Ok(self.propagate(id))
    }

    /// Records the finishing positions of all participants in the match `id`. Every
    /// participant of the match must be placed exactly once, ties share a position.
    pub fn record_placements(
        &mut self,
        id: MatchId,
        placements: &[(ParticipantId, u32)],
        points: &PointsTable,
    ) -> Result<Vec<MatchId>> {
        let index = self.position(id).ok_or(Error::UnknownMatch(id))?;

        let m = &mut self[index];
        if m.state != MatchState::Open {
            return Err(Error::MatchNotOpen { id, state: m.state });
        }

        if placements.len() != m.entrants.len() {
            return Err(Error::InvalidPlacements(format!(
                "expected {} placements, found {}",
                m.entrants.len(),
                placements.len()
            )));
        }

        let mut seen = HashSet::with_capacity(placements.len());
        for (participant, position) in placements {
            if !m.contains(*participant) {
                return Err(Error::NotInMatch {
                    id,
                    participant: *participant,
                });
            }

            if !seen.insert(*participant) {
                return Err(Error::InvalidPlacements(format!(
                    "participant {} is placed more than once",
                    participant
                )));
            }

            if *position == 0 || *position as usize > placements.len() {
                return Err(Error::InvalidPlacements(format!(
                    "position {} is out of range",
                    position
                )));
            }
        }

        let mut placements: Vec<Placement> = placements
            .iter()
            .map(|(participant, position)| Placement {
                participant: *participant,
                position: *position,
                points: points.points(*position),
            })
            .collect();
        // Stable, so tied positions keep the submitted order.
        placements.sort_by_key(|placement| placement.position);

        m.winner = placements.first().map(|placement| placement.participant);
        m.loser = None;
        m.placements = placements;
        m.state = MatchState::Complete;
        m.underway = false;
        m.station = None;

        log::debug!("Recorded placements of match {}", id);

        Ok(self.propagate(id))
    }

    /// Reopens the completed match `id`. Every slot that consumed its winner or loser is
    /// cleared, and completed dependent matches are reopened recursively. Returns the ids of
    /// all reset matches, starting with `id`.
    pub fn reopen(&mut self, id: MatchId) -> Result<Vec<MatchId>> {
        let index = self.position(id).ok_or(Error::UnknownMatch(id))?;

        let state = self[index].state;
        if state != MatchState::Complete {
            return Err(Error::MatchNotComplete { id, state });
        }

        let mut reset = Vec::new();
        self.reset(index, &mut reset);

        log::debug!("Reopened match {}, reset {} matches", id, reset.len());

        Ok(reset)
    }

    fn reset(&mut self, index: usize, reset: &mut Vec<MatchId>) {
        let m = &mut self[index];
        m.winner = None;
        m.loser = None;
        m.scores = None;
        m.forfeit = false;
        m.placements.clear();
        m.underway = false;
        m.state = if m.is_ready() {
            MatchState::Open
        } else {
            MatchState::Pending
        };

        let id = m.id;
        reset.push(id);

        for (dependent, slot) in self.dependents(id) {
            if self[dependent].state == MatchState::Complete {
                self.reset(dependent, reset);
            }

            let m = &mut self[dependent];
            m.entrants[slot].entrant = None;
            m.state = MatchState::Pending;
            m.underway = false;
        }
    }

    /// Returns the positions of the matches and slots fed by the match `id`.
    fn dependents(&self, id: MatchId) -> Vec<(usize, usize)> {
        let mut dependents = Vec::new();
        for (index, m) in self.iter().enumerate() {
            for (slot, entrant) in m.entrants.iter().enumerate() {
                if matches!(entrant.source, Some(source) if source.match_id == id) {
                    dependents.push((index, slot));
                }
            }
        }

        dependents
    }

    /// Fills the slots waiting on the completed match `id` and opens every match whose slots
    /// are now all resolved.
    pub(crate) fn propagate(&mut self, id: MatchId) -> Vec<MatchId> {
        let Some(m) = self.get_by_id(id) else {
            return Vec::new();
        };
        let (winner, loser) = (m.winner, m.loser);

        let mut opened = Vec::new();
        for (index, slot) in self.dependents(id) {
            let m = &mut self[index];
            let source = m.entrants[slot].source;
            m.entrants[slot].entrant = match source {
                Some(source) if source.is_loser => loser,
                _ => winner,
            };

            if m.state == MatchState::Pending && m.is_ready() {
                m.state = MatchState::Open;
                opened.push(m.id);
            }
        }

        opened
    }

    /// Marks the open match `id` as being played.
    pub fn mark_underway(&mut self, id: MatchId) -> Result<()> {
        self.set_underway(id, true)
    }

    pub fn unmark_underway(&mut self, id: MatchId) -> Result<()> {
        self.set_underway(id, false)
    }

    fn set_underway(&mut self, id: MatchId, underway: bool) -> Result<()> {
        let m = self.get_by_id_mut(id).ok_or(Error::UnknownMatch(id))?;
        if m.state != MatchState::Open {
            return Err(Error::MatchNotOpen { id, state: m.state });
        }

        m.underway = underway;
        Ok(())
    }

    /// Assigns the match `id` to a `station`, or releases it with `None`.
    pub fn assign_station(&mut self, id: MatchId, station: Option<String>) -> Result<()> {
        let m = self.get_by_id_mut(id).ok_or(Error::UnknownMatch(id))?;
        if m.state == MatchState::Complete {
            return Err(Error::MatchComplete(id));
        }

        m.station = station;
        Ok(())
    }

    pub fn stats(&self) -> MatchStats {
        let mut stats = MatchStats {
            total: self.len(),
            ..Default::default()
        };

        for m in self.iter() {
            match m.state {
                MatchState::Pending => stats.pending += 1,
                MatchState::Open => stats.open += 1,
                MatchState::Complete => stats.complete += 1,
            }

            if m.underway {
                stats.underway += 1;
            }
        }

        stats
    }

    /// Replaces the generation ids of all matches with the storage ids from `ids`, including
    /// all prerequisite references.
    pub fn remap_ids(&mut self, ids: &HashMap<MatchId, MatchId>) -> Result<()> {
        let lookup = |id: MatchId| {
            ids.get(&id)
                .copied()
                .ok_or_else(|| invalid_bracket(format!("no storage id for match {}", id)))
        };

        let mut remapped = Vec::with_capacity(self.len());
        for m in self.iter() {
            let mut m = m.clone();
            m.id = lookup(m.id)?;
            for slot in m.entrants.iter_mut() {
                if let Some(source) = &mut slot.source {
                    source.match_id = lookup(source.match_id)?;
                }
            }

            remapped.push(m);
        }

        *self = Matches::from(remapped);
        self.validate()
    }

    /// Assigns the play order and identifiers to all matches without one, continuing after
    /// the highest play order already assigned.
    ///
    /// Matches are ordered by the length of their prerequisite chain, then by round and
    /// section.
    pub(crate) fn sequence(&mut self) {
        let start = self.iter().map(|m| m.play_order).max().unwrap_or(0);
        self.sequence_from(start);
    }

    /// Like [`sequence`], but starts after the play order `start`. Used for matches that are
    /// appended to an existing graph.
    ///
    /// [`sequence`]: Self::sequence
    pub(crate) fn sequence_from(&mut self, start: u32) {
        let depths = self.depths();

        let mut order: Vec<usize> = (0..self.len())
            .filter(|&index| self[index].play_order == 0)
            .collect();
        order.sort_by_key(|&index| {
            let m = &self[index];
            (depths[index], m.round.abs(), m.section, m.id)
        });

        for (offset, index) in order.into_iter().enumerate() {
            let play_order = start + offset as u32 + 1;
            let m = &mut self[index];
            m.play_order = play_order;
            m.identifier = identifier(play_order as usize - 1);
        }
    }

    /// Returns the length of the longest prerequisite chain of every match.
    fn depths(&self) -> Vec<usize> {
        let positions: HashMap<MatchId, usize> = self
            .iter()
            .enumerate()
            .map(|(index, m)| (m.id, index))
            .collect();

        fn depth(
            matches: &Matches,
            positions: &HashMap<MatchId, usize>,
            memo: &mut [Option<usize>],
            index: usize,
        ) -> usize {
            if let Some(depth) = memo[index] {
                return depth;
            }

            // Mark before recursing so a malformed cycle cannot recurse forever.
            memo[index] = Some(0);
            let depth_of: Vec<usize> = matches[index]
                .prerequisites()
                .filter_map(|prerequisite| positions.get(&prerequisite.match_id).copied())
                .collect();

            let value = depth_of
                .into_iter()
                .map(|prerequisite| depth(matches, positions, memo, prerequisite) + 1)
                .max()
                .unwrap_or(0);
            memo[index] = Some(value);
            value
        }

        let mut memo = vec![None; self.len()];
        (0..self.len())
            .map(|index| depth(self, &positions, &mut memo, index))
            .collect()
    }
}

fn invalid_bracket(message: String) -> Error {
    log::error!("Invalid bracket: {}", message);
    Error::InvalidBracket(message)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::options::PointsTable;
    use crate::{
        Error, Match, MatchId, MatchResult, MatchState, Matches, ParticipantId, Section, Slot,
    };

    /// Two semi finals feeding a final.
    fn bracket() -> Matches {
        let mut matches = Matches::from(vec![
            Match::new(
                MatchId(1),
                1,
                Section::Main,
                vec![Slot::entrant(ParticipantId(1)), Slot::entrant(ParticipantId(4))],
            ),
            Match::new(
                MatchId(2),
                1,
                Section::Main,
                vec![Slot::entrant(ParticipantId(2)), Slot::entrant(ParticipantId(3))],
            ),
            Match::new(
                MatchId(3),
                2,
                Section::Main,
                vec![Slot::winner_of(MatchId(1)), Slot::winner_of(MatchId(2))],
            ),
            Match::new(
                MatchId(4),
                2,
                Section::ThirdPlace,
                vec![Slot::loser_of(MatchId(1)), Slot::loser_of(MatchId(2))],
            ),
        ]);
        matches.sequence();
        matches
    }

    #[test]
    fn test_validate() {
        let mut matches = bracket();
        assert!(matches.validate().is_ok());

        matches[3].entrants[0] = Slot::winner_of(MatchId(9));
        assert!(matches!(
            matches.validate(),
            Err(Error::InvalidBracket(_))
        ));

        let mut matches = bracket();
        matches[0].entrants[0] = Slot::winner_of(MatchId(3));
        assert!(matches.validate().unwrap_err().is_fatal());

        let mut matches = bracket();
        matches[1].id = MatchId(1);
        assert!(matches.validate().is_err());
    }

    #[test]
    fn test_report_result() {
        let mut matches = bracket();
        assert_eq!(matches[2].state, MatchState::Pending);

        let opened = matches
            .report_result(MatchId(1), MatchResult::new(ParticipantId(1)).scores(2, 1))
            .unwrap();
        assert!(opened.is_empty());
        assert_eq!(matches[2].entrants[0].entrant, Some(ParticipantId(1)));
        assert_eq!(matches[3].entrants[0].entrant, Some(ParticipantId(4)));
        assert_eq!(matches[0].score_of(ParticipantId(4)), Some(1));

        let opened = matches
            .report_result(MatchId(2), MatchResult::new(ParticipantId(3)).forfeit())
            .unwrap();
        assert_eq!(opened, [MatchId(3), MatchId(4)]);
        assert!(matches[1].forfeit);
        assert_eq!(matches[2].state, MatchState::Open);

        assert_eq!(
            matches.report_result(MatchId(1), MatchResult::new(ParticipantId(1))),
            Err(Error::MatchNotOpen {
                id: MatchId(1),
                state: MatchState::Complete
            })
        );
        assert_eq!(
            matches.report_result(MatchId(3), MatchResult::new(ParticipantId(2))),
            Err(Error::NotInMatch {
                id: MatchId(3),
                participant: ParticipantId(2)
            })
        );
        assert_eq!(
            matches.report_result(MatchId(7), MatchResult::new(ParticipantId(2))),
            Err(Error::UnknownMatch(MatchId(7)))
        );
    }

    #[test]
    fn test_reopen() {
        let mut matches = bracket();
        for (id, winner) in [(1, 1), (2, 2), (3, 1)] {
            matches
                .report_result(MatchId(id), MatchResult::new(ParticipantId(winner)))
                .unwrap();
        }

        let reset = matches.reopen(MatchId(1)).unwrap();
        assert_eq!(reset, [MatchId(1), MatchId(3)]);
        assert_eq!(matches[0].state, MatchState::Open);
        assert_eq!(matches[2].state, MatchState::Pending);
        assert_eq!(matches[2].entrants[0].entrant, None);
        assert_eq!(matches[2].entrants[1].entrant, Some(ParticipantId(2)));
        assert_eq!(matches[2].winner, None);
        assert_eq!(matches[3].state, MatchState::Pending);

        assert_eq!(
            matches.reopen(MatchId(3)),
            Err(Error::MatchNotComplete {
                id: MatchId(3),
                state: MatchState::Pending
            })
        );
    }

    #[test]
    fn test_record_placements() {
        let mut matches = Matches::from(vec![Match::new(
            MatchId(1),
            1,
            Section::Main,
            (1..=4).map(|id| Slot::entrant(ParticipantId(id))).collect(),
        )]);
        let points = PointsTable::default();

        let err = matches
            .record_placements(
                MatchId(1),
                &[(ParticipantId(1), 1), (ParticipantId(1), 2), (ParticipantId(3), 3), (ParticipantId(4), 4)],
                &points,
            )
            .unwrap_err();
        assert_eq!(err.code(), "invalid_placements");

        let err = matches
            .record_placements(MatchId(1), &[(ParticipantId(1), 1)], &points)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_placements");

        matches
            .record_placements(
                MatchId(1),
                &[(ParticipantId(3), 2), (ParticipantId(1), 1), (ParticipantId(2), 2), (ParticipantId(4), 4)],
                &points,
            )
            .unwrap();

        let m = &matches[0];
        assert_eq!(m.state, MatchState::Complete);
        assert_eq!(m.winner, Some(ParticipantId(1)));
        assert_eq!(m.placements[1].participant, ParticipantId(3));
        assert_eq!(m.placements[1].points, 6);
        assert_eq!(m.placements[2].points, 6);
        assert_eq!(m.placements[3].points, 1);
    }

    #[test]
    fn test_underway_and_stations() {
        let mut matches = bracket();

        matches.mark_underway(MatchId(1)).unwrap();
        matches
            .assign_station(MatchId(1), Some(String::from("Table 1")))
            .unwrap();
        assert_eq!(
            matches.mark_underway(MatchId(3)),
            Err(Error::MatchNotOpen {
                id: MatchId(3),
                state: MatchState::Pending
            })
        );

        let stats = matches.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.underway, 1);

        matches
            .report_result(MatchId(1), MatchResult::new(ParticipantId(4)))
            .unwrap();
        assert!(!matches[0].underway);
        assert_eq!(matches[0].station, None);
        assert_eq!(
            matches.assign_station(MatchId(1), None),
            Err(Error::MatchComplete(MatchId(1)))
        );
    }

    #[test]
    fn test_sequence() {
        let matches = bracket();

        let orders: Vec<_> = matches
            .iter()
            .map(|m| (m.play_order, m.identifier.as_str()))
            .collect();
        assert_eq!(orders, [(1, "A"), (2, "B"), (3, "C"), (4, "D")]);
    }

    #[test]
    fn test_remap_ids() {
        let mut matches = bracket();
        let ids: HashMap<_, _> = (1..=4).map(|id| (MatchId(id), MatchId(id + 100))).collect();

        matches.remap_ids(&ids).unwrap();
        assert_eq!(matches[2].id, MatchId(103));
        assert_eq!(matches[2].entrants[1], Slot::winner_of(MatchId(102)));

        let ids = HashMap::from([(MatchId(101), MatchId(1))]);
        assert!(matches.remap_ids(&ids).is_err());
    }
}
