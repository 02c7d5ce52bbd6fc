//! Arena based construction of elimination brackets.
//!
//! Brackets are first laid out as a full power-of-two tree of [`Node`]s referencing each other
//! by position. Byes are then collapsed so no match with an empty slot is ever emitted, and the
//! remaining nodes are converted into [`Match`]es with ids.
use crate::{Match, MatchId, Matches, ParticipantId, Result, Section, Slot};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Seat {
    Entrant(ParticipantId),
    /// The winner of the node at the given position.
    Winner(usize),
    /// The loser of the node at the given position.
    Loser(usize),
    Bye,
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub round: i32,
    pub section: Section,
    pub seats: [Seat; 2],
}

#[derive(Clone, Debug, Default)]
pub(crate) struct BracketBuilder {
    nodes: Vec<Option<Node>>,
}

impl BracketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new node, returning its position.
    pub fn push(&mut self, round: i32, section: Section, seats: [Seat; 2]) -> usize {
        self.nodes.push(Some(Node {
            round,
            section,
            seats,
        }));
        self.nodes.len() - 1
    }

    /// Removes every node that has less than two live seats. A node with a single live seat
    /// forwards it to the seats consuming its winner, seats consuming its loser become byes.
    ///
    /// Returns the number of removed nodes.
    pub fn collapse_byes(&mut self) -> usize {
        let mut removed = 0;

        loop {
            let mut changed = false;

            for index in 0..self.nodes.len() {
                let forward = match &self.nodes[index] {
                    Some(node) => {
                        let live: Vec<Seat> = node
                            .seats
                            .iter()
                            .copied()
                            .filter(|seat| *seat != Seat::Bye)
                            .collect();

                        if live.len() == 2 {
                            continue;
                        }

                        live.first().copied().unwrap_or(Seat::Bye)
                    }
                    None => continue,
                };

                self.nodes[index] = None;
                self.replace(Seat::Winner(index), forward);
                self.replace(Seat::Loser(index), Seat::Bye);

                removed += 1;
                changed = true;
            }

            if !changed {
                break;
            }
        }

        removed
    }

    fn replace(&mut self, from: Seat, to: Seat) {
        for node in self.nodes.iter_mut().flatten() {
            for seat in node.seats.iter_mut() {
                if *seat == from {
                    *seat = to;
                }
            }
        }
    }

    /// Converts all remaining nodes into matches with ids counting up from `first_id`.
    pub fn build(self, first_id: MatchId) -> Result<Matches> {
        let mut ids = Vec::with_capacity(self.nodes.len());
        let mut next = first_id.0;
        for node in &self.nodes {
            match node {
                Some(_) => {
                    ids.push(Some(MatchId(next)));
                    next += 1;
                }
                None => ids.push(None),
            }
        }

        let slot = |seat: Seat| -> Option<Slot> {
            match seat {
                Seat::Entrant(id) => Some(Slot::entrant(id)),
                Seat::Winner(index) => ids[index].map(Slot::winner_of),
                Seat::Loser(index) => ids[index].map(Slot::loser_of),
                Seat::Bye => None,
            }
        };

        let mut matches = Matches::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            let (Some(node), Some(id)) = (node, ids[index]) else {
                continue;
            };

            let mut entrants = Vec::with_capacity(2);
            for seat in node.seats {
                match slot(seat) {
                    Some(slot) => entrants.push(slot),
                    None => {
                        let message = format!("node {} refers to a removed seat {:?}", index, seat);
                        log::error!("Invalid bracket: {}", message);
                        return Err(crate::Error::InvalidBracket(message));
                    }
                }
            }

            matches.push(Match::new(id, node.round, node.section, entrants));
        }

        matches.validate()?;
        Ok(matches)
    }
}
